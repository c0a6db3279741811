//! The `Backend` trait -- the adapter interface for agent CLIs.
//!
//! Each concrete backend (Claude Code, Gemini CLI, opencode) implements this
//! trait. The trait is object-safe so backends can be stored as
//! `Box<dyn Backend>` in the [`super::BackendRegistry`] and handed to the
//! runner as `&dyn Backend`.

use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;

use super::events::CanonicalEvent;

/// How a backend delivers its output on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One JSON document covering the whole run, parsed once at exit.
    SingleShot,
    /// One JSON record per line, translated as each line completes.
    Streaming,
}

/// Everything needed to launch a backend process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument (builder style).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build the subprocess command.
    ///
    /// Stdin is closed since no further input is ever sent; stdout and
    /// stderr are captured.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Adapter interface for one external agent CLI.
///
/// Implementors own the tool's command line and the translation of its
/// native output records into [`CanonicalEvent`]s. They hold no per-query
/// state; everything mutable lives in the runner.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Identifier used for lookup (e.g. "claude").
    fn name(&self) -> &str;

    /// Whether stdout is one final document or a stream of records.
    fn mode(&self) -> OutputMode;

    /// The process to launch for `question`.
    fn invocation(&self, question: &str) -> Invocation;

    /// Translate one decoded native record into zero or more canonical
    /// events. Unrecognised records yield nothing.
    fn translate(&self, record: &Value) -> Vec<CanonicalEvent>;

    /// For single-shot backends: the error message if the final document
    /// flags itself as failed.
    fn document_error(&self, _document: &Value) -> Option<String> {
        None
    }
}

// Compile-time assertion: Backend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Backend) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EchoBackend;

    impl Backend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn mode(&self) -> OutputMode {
            OutputMode::Streaming
        }

        fn invocation(&self, question: &str) -> Invocation {
            Invocation::new("echo").arg(question)
        }

        fn translate(&self, record: &Value) -> Vec<CanonicalEvent> {
            record
                .as_str()
                .map(|text| CanonicalEvent::TextDelta {
                    text: text.to_string(),
                })
                .into_iter()
                .collect()
        }
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn Backend> = Box::new(EchoBackend);
        assert_eq!(backend.name(), "echo");
        assert_eq!(backend.mode(), OutputMode::Streaming);
        assert!(backend.document_error(&Value::Null).is_none());
    }

    #[test]
    fn invocation_builder_collects_args() {
        let inv = Invocation::new("claude").arg("-p").arg("hello");
        assert_eq!(inv.program, "claude");
        assert_eq!(inv.args, vec!["-p", "hello"]);
    }

    #[tokio::test]
    async fn invocation_command_closes_stdin() {
        // `cat` exits immediately when stdin is closed.
        let output = Invocation::new("cat").command().output().await.unwrap();
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }
}
