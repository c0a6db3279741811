//! Shared test utilities for askc integration tests.
//!
//! Provides throwaway SQLite databases and fake backend executables. Each
//! helper returns the [`TempDir`] that owns its files; keep it alive for the
//! duration of the test.

use std::fs;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tempfile::TempDir;

use askc_db::config::DbConfig;
use askc_db::pool;

/// Create a temporary database file with migrations applied.
///
/// Returns `(pool, dir)`. The database lives inside `dir` and is removed
/// when `dir` is dropped.
pub async fn create_test_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = DbConfig::new(dir.path().join("usage.db"));

    let pool = pool::open(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to open test database: {e:#}"));

    (pool, dir)
}

/// Write an executable `sh` script named `name` into `dir` and return its
/// path. `body` is everything after the shebang line.
///
/// Fake backends ignore their arguments unless `body` inspects `"$@"`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|e| panic!("failed to chmod {}: {e}", path.display()));
    }

    path
}

/// A fake backend that prints `stdout` verbatim and exits with `code`.
///
/// `stdout` is embedded in a quoted heredoc, so it is not subject to shell
/// expansion.
pub fn fake_backend(dir: &Path, name: &str, stdout: &str, code: i32) -> PathBuf {
    let body = format!("cat <<'ASKC_EOF'\n{stdout}\nASKC_EOF\nexit {code}");
    write_script(dir, name, &body)
}

/// A fresh temporary directory for fake backends and scratch files.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
