//! Configuration file management for askc.
//!
//! Provides a TOML-based config file at `~/.config/askc/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use askc_core::backend::registry::{BACKEND_ENV_VAR, BUILTIN_BACKENDS, default_backend};
use askc_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

/// On-disk configuration. Every section is optional.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub backend: BackendSection,
    pub database: DatabaseSection,
    /// Per-backend overrides, keyed by backend name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub backends: BTreeMap<String, BackendOverride>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Backend used when `--backend` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Kill a backend that has not finished after this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOverride {
    /// Path to the backend's executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

impl ConfigFile {
    /// The config written by `askc init`: every default spelled out.
    pub fn starter() -> Self {
        Self {
            backend: BackendSection {
                default: Some(default_backend(None).to_string()),
                timeout_secs: None,
            },
            database: DatabaseSection {
                path: Some(DbConfig::default_path()),
            },
            backends: BUILTIN_BACKENDS
                .iter()
                .map(|name| {
                    (
                        name.to_string(),
                        BackendOverride {
                            binary: Some(name.to_string()),
                        },
                    )
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the askc config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/askc` or `~/.config/askc`.
pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("askc");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("askc")
}

/// Return the path to the askc config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`. A missing file is `Ok(None)`.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, each overriding everything else.
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub backend: Option<&'a str>,
    pub timeout_secs: Option<u64>,
    pub database: Option<&'a Path>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct AskcConfig {
    pub backend: String,
    pub timeout: Option<Duration>,
    pub db_config: DbConfig,
    /// Backend name to binary path.
    pub binaries: HashMap<String, String>,
}

impl AskcConfig {
    /// Resolve configuration from the config file at [`config_path`].
    ///
    /// An unreadable config file is reported and ignored.
    pub fn resolve(cli: &CliOverrides<'_>) -> Self {
        let path = config_path();
        let file = load_config_from(&path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "ignoring config file");
            None
        });
        Self::resolve_with(cli, file.unwrap_or_default())
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Backend: `--backend` > `ASKC_BACKEND` > `[backend] default` > `claude`.
    ///   An unsupported env or file value falls back to `claude`; an
    ///   unsupported `--backend` is kept so the query is rejected.
    /// - Timeout: `--timeout` > `[backend] timeout_secs` > none.
    /// - Database: `--database` > `ASKC_DATABASE_PATH` > `[database] path` >
    ///   the XDG data directory.
    pub fn resolve_with(cli: &CliOverrides<'_>, file: ConfigFile) -> Self {
        let backend = match cli.backend {
            Some(name) => name.to_string(),
            None => {
                let env = std::env::var(BACKEND_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
                default_backend(env.as_deref().or(file.backend.default.as_deref())).to_string()
            }
        };

        let timeout = cli
            .timeout_secs
            .or(file.backend.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let db_config = DbConfig::resolve(cli.database, file.database.path);

        let binaries = file
            .backends
            .into_iter()
            .filter_map(|(name, o)| o.binary.map(|binary| (name, binary)))
            .collect();

        Self {
            backend,
            timeout,
            db_config,
            binaries,
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
