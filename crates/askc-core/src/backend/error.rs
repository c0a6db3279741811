//! Errors that reject a query.

use std::io;
use std::time::Duration;

/// Why an invocation was rejected instead of resolving to a
/// [`super::QueryResult`].
///
/// Malformed records from a streaming backend are not errors; they are
/// dropped while the query keeps running.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The requested backend is not one of the supported identifiers.
    #[error("unknown backend {name:?} (expected one of: {})", .known.join(", "))]
    UnknownBackend { name: String, known: Vec<String> },

    /// The backend binary could not be launched.
    #[error("failed to spawn {program:?} -- is it installed and on PATH?")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The backend exited unsuccessfully. Any partial answer is discarded.
    #[error("{backend} exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    Exit {
        backend: String,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
        /// The last lines the backend wrote to stderr.
        stderr: String,
    },

    /// A single-shot backend produced an unparsable or error-flagged document.
    #[error("{backend} reported an error: {message}")]
    Protocol { backend: String, message: String },

    /// The backend did not finish within the configured timeout and was killed.
    #[error("{backend} did not finish within {}s", .after.as_secs())]
    Timeout { backend: String, after: Duration },

    /// Reading the backend's output or waiting on it failed.
    #[error("I/O error while running {backend}")]
    Io {
        backend: String,
        #[source]
        source: io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_lists_choices() {
        let err = QueryError::UnknownBackend {
            name: "gpt".into(),
            known: vec!["claude".into(), "gemini".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown backend \"gpt\" (expected one of: claude, gemini)"
        );
    }

    #[test]
    fn exit_includes_code_and_stderr() {
        let err = QueryError::Exit {
            backend: "gemini".into(),
            code: Some(2),
            stderr: "quota exceeded\n".into(),
        };
        assert_eq!(err.to_string(), "gemini exited with exit code 2: quota exceeded");
    }

    #[test]
    fn exit_without_code_mentions_signal() {
        let err = QueryError::Exit {
            backend: "claude".into(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "claude exited with no exit code (killed by signal)"
        );
    }

    #[test]
    fn spawn_keeps_io_source() {
        let err = QueryError::Spawn {
            program: "/nope/claude".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/nope/claude"));
    }
}
