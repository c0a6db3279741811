use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "ASKC_DATABASE_PATH";

/// Database configuration.
///
/// See [`DbConfig::resolve`] for where the path comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

impl DbConfig {
    /// Resolve the database location.
    ///
    /// Priority: `explicit` (a CLI flag), then the `ASKC_DATABASE_PATH` env
    /// var, then `configured` (the config file), then
    /// [`DbConfig::default_path`].
    pub fn resolve(explicit: Option<&Path>, configured: Option<PathBuf>) -> Self {
        Self::resolve_from(explicit, env::var_os(DB_PATH_ENV), configured)
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env_path: Option<OsString>,
        configured: Option<PathBuf>,
    ) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_path.filter(|p| !p.is_empty()).map(PathBuf::from))
            .or(configured)
            .unwrap_or_else(Self::default_path);
        Self { path }
    }

    /// Build a config from an explicit path (useful for tests and CLI flags).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default database location under the XDG data directory.
    pub fn default_path() -> PathBuf {
        data_home(env::var_os("XDG_DATA_HOME"), dirs::home_dir())
            .join("askc")
            .join("usage.db")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve the XDG data home. Relative values of `XDG_DATA_HOME` are ignored
/// as the basedir spec requires.
fn data_home(xdg_data_home: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = xdg_data_home.map(PathBuf::from).filter(|p| p.is_absolute()) {
        return dir;
    }
    home.unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
}
