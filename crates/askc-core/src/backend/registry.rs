//! Backend registry -- the fixed set of supported backends, keyed by name.
//!
//! The registry is assembled once at startup and never mutated afterwards.
//! Lookups of anything outside the built-in set fail with
//! [`QueryError::UnknownBackend`] before any process is spawned.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::claude::ClaudeBackend;
use super::error::QueryError;
use super::gemini::GeminiBackend;
use super::opencode::OpencodeBackend;
use super::trait_def::Backend;

/// Backend used when no override names a supported one.
pub const DEFAULT_BACKEND: &str = ClaudeBackend::NAME;

/// Environment variable naming the default backend.
pub const BACKEND_ENV_VAR: &str = "ASKC_BACKEND";

/// Every supported backend identifier.
pub const BUILTIN_BACKENDS: [&str; 3] = [
    ClaudeBackend::NAME,
    GeminiBackend::NAME,
    OpencodeBackend::NAME,
];

/// Resolve the default backend from an optional override.
///
/// Returns the override when it names a supported backend, otherwise
/// [`DEFAULT_BACKEND`].
pub fn default_backend(override_name: Option<&str>) -> &'static str {
    let Some(requested) = override_name.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_BACKEND;
    };
    match BUILTIN_BACKENDS.iter().find(|name| **name == requested) {
        Some(name) => *name,
        None => {
            warn!(
                requested,
                fallback = DEFAULT_BACKEND,
                "ignoring unsupported backend override"
            );
            DEFAULT_BACKEND
        }
    }
}

/// The supported backends, keyed by name.
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    /// The built-in backends, each looking for its binary on `$PATH`.
    pub fn builtin() -> Self {
        Self::with_binaries(&HashMap::new())
    }

    /// The built-in backends, with per-backend binary path overrides.
    ///
    /// Overrides for names outside the built-in set are ignored.
    pub fn with_binaries(overrides: &HashMap<String, String>) -> Self {
        let binary = |name: &str| overrides.get(name).cloned();

        let mut registry = Self {
            backends: BTreeMap::new(),
        };
        registry.register(
            binary(ClaudeBackend::NAME)
                .map(ClaudeBackend::with_binary)
                .unwrap_or_default(),
        );
        registry.register(
            binary(GeminiBackend::NAME)
                .map(GeminiBackend::with_binary)
                .unwrap_or_default(),
        );
        registry.register(
            binary(OpencodeBackend::NAME)
                .map(OpencodeBackend::with_binary)
                .unwrap_or_default(),
        );

        for name in overrides.keys() {
            if !registry.backends.contains_key(name) {
                warn!(backend = %name, "ignoring binary override for unknown backend");
            }
        }
        registry
    }

    fn register(&mut self, backend: impl Backend + 'static) {
        let name = backend.name().to_string();
        self.backends.insert(name, Box::new(backend));
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Result<&dyn Backend, QueryError> {
        self.backends
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| QueryError::UnknownBackend {
                name: name.to_string(),
                known: self.list().iter().map(|s| s.to_string()).collect(),
            })
    }

    /// Names of all registered backends, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends.values().collect::<Vec<_>>())
            .finish()
    }
}
