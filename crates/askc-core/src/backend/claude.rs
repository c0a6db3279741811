//! Claude Code backend.
//!
//! Runs `claude -p <prompt> --output-format json`, which prints a single
//! JSON document once the run is over. The runner parses that document at
//! exit, so this backend delivers its whole answer in one delta.

use serde_json::Value;

use super::events::CanonicalEvent;
use super::fields::{f64_field, str_field};
use super::trait_def::{Backend, Invocation, OutputMode};
use crate::prompt::compose_prompt;

/// Tools the agent may use while answering.
const ALLOWED_TOOLS: &str = "Read,Glob,Grep,Bash,WebSearch,WebFetch";

/// Backend adapter for [Claude Code](https://docs.anthropic.com/en/docs/claude-code)
/// in single-shot JSON mode.
#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
}

impl ClaudeBackend {
    pub const NAME: &'static str = "claude";

    /// Create a backend that will look for `claude` on `$PATH`.
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    /// Create a backend with a custom binary path.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
        }
    }
}

impl Default for ClaudeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ClaudeBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mode(&self) -> OutputMode {
        OutputMode::SingleShot
    }

    fn invocation(&self, question: &str) -> Invocation {
        Invocation::new(&self.binary)
            .arg("-p")
            .arg(compose_prompt(question))
            .arg("--output-format")
            .arg("json")
            .arg("--allowedTools")
            .arg(ALLOWED_TOOLS)
    }

    fn translate(&self, document: &Value) -> Vec<CanonicalEvent> {
        let mut events = Vec::new();
        if let Some(text) = str_field(document, &["result"]) {
            events.push(CanonicalEvent::TextDelta {
                text: text.to_string(),
            });
        }
        if let Some(cost) = f64_field(document, &["total_cost_usd"]) {
            events.push(CanonicalEvent::CostUpdate {
                total_cost_usd: cost,
            });
        }
        events
    }

    fn document_error(&self, document: &Value) -> Option<String> {
        let is_error = document
            .get("is_error")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !is_error {
            return None;
        }

        let non_blank = |m: &&str| !m.trim().is_empty();
        let message = str_field(document, &["error"])
            .filter(non_blank)
            .or_else(|| {
                document
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .filter(non_blank)
            })
            .or_else(|| str_field(document, &["result"]).filter(non_blank))
            .unwrap_or("backend flagged the run as failed");
        Some(message.to_string())
    }
}
