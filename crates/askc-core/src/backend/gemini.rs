//! Gemini CLI backend.
//!
//! Runs `gemini -p <prompt> --output-format stream-json` and translates its
//! JSONL records:
//!
//! ```text
//! {"type":"text","text":"..."}
//! {"type":"thinking","text":"..."}
//! {"type":"tool_use","id":"t1","name":"bash","input":{...}}
//! {"type":"tool_result","tool_use_id":"t1","content":"..."}
//! {"type":"usage","total_cost_usd":0.01}
//! {"type":"done","total_cost_usd":0.02}
//! ```

use serde_json::Value;
use tracing::debug;

use super::events::CanonicalEvent;
use super::fields::{f64_field, object_field, record_type, str_field, text_field};
use super::trait_def::{Backend, Invocation, OutputMode};
use crate::prompt::compose_prompt;

/// Backend adapter for the Gemini CLI in stream-json mode.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    binary: String,
}

impl GeminiBackend {
    pub const NAME: &'static str = "gemini";

    pub fn new() -> Self {
        Self::with_binary("gemini")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
        }
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mode(&self) -> OutputMode {
        OutputMode::Streaming
    }

    fn invocation(&self, question: &str) -> Invocation {
        Invocation::new(&self.binary)
            .arg("-p")
            .arg(compose_prompt(question))
            .arg("--output-format")
            .arg("stream-json")
    }

    fn translate(&self, record: &Value) -> Vec<CanonicalEvent> {
        let event = match record_type(record) {
            "text" => str_field(record, &["text"]).map(|text| CanonicalEvent::TextDelta {
                text: text.to_string(),
            }),
            "thinking" => str_field(record, &["text", "thinking"]).map(|text| {
                CanonicalEvent::Thinking {
                    text: text.to_string(),
                }
            }),
            "tool_use" => Some(CanonicalEvent::tool_use(
                str_field(record, &["id", "tool_id"]).map(str::to_string),
                str_field(record, &["name", "tool_name", "tool"]).unwrap_or("unknown"),
                object_field(record, &["input", "parameters"]),
            )),
            "tool_result" => Some(CanonicalEvent::tool_result(
                str_field(record, &["tool_use_id", "tool_id", "id"]).map(str::to_string),
                &text_field(record, &["content", "output"]).unwrap_or_default(),
            )),
            "usage" | "done" => f64_field(record, &["total_cost_usd", "cost_usd"])
                .map(|cost| CanonicalEvent::CostUpdate {
                    total_cost_usd: cost,
                }),
            other => {
                debug!(event_type = other, "ignoring unrecognised gemini record");
                None
            }
        };
        event.into_iter().collect()
    }
}
