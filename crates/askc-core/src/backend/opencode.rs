//! opencode backend.
//!
//! Runs `opencode run --format json <prompt>`. Records use kebab-case tool
//! types and camelCase correlation fields, and cost arrives on
//! `step_finish`:
//!
//! ```text
//! {"type":"text","text":"..."}
//! {"type":"reasoning","text":"..."}
//! {"type":"tool-call","toolCallId":"c1","toolName":"read","args":{...}}
//! {"type":"tool-result","toolCallId":"c1","result":"..."}
//! {"type":"step_finish","cost":0.003}
//! ```

use serde_json::Value;
use tracing::debug;

use super::events::CanonicalEvent;
use super::fields::{f64_field, object_field, record_type, str_field, text_field};
use super::trait_def::{Backend, Invocation, OutputMode};
use crate::prompt::compose_prompt;

/// Backend adapter for [opencode](https://opencode.ai) in JSON event mode.
#[derive(Debug, Clone)]
pub struct OpencodeBackend {
    binary: String,
}

impl OpencodeBackend {
    pub const NAME: &'static str = "opencode";

    pub fn new() -> Self {
        Self::with_binary("opencode")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
        }
    }
}

impl Default for OpencodeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for OpencodeBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mode(&self) -> OutputMode {
        OutputMode::Streaming
    }

    fn invocation(&self, question: &str) -> Invocation {
        Invocation::new(&self.binary)
            .arg("run")
            .arg("--format")
            .arg("json")
            .arg(compose_prompt(question))
    }

    fn translate(&self, record: &Value) -> Vec<CanonicalEvent> {
        let event = match record_type(record) {
            "text" => str_field(record, &["text"]).map(|text| CanonicalEvent::TextDelta {
                text: text.to_string(),
            }),
            "thinking" | "reasoning" => {
                str_field(record, &["text"]).map(|text| CanonicalEvent::Thinking {
                    text: text.to_string(),
                })
            }
            "tool-call" | "tool_use" => Some(CanonicalEvent::tool_use(
                str_field(record, &["toolCallId", "id"]).map(str::to_string),
                str_field(record, &["toolName", "tool", "name"]).unwrap_or("unknown"),
                object_field(record, &["args", "input"]),
            )),
            "tool-result" | "tool_result" => Some(CanonicalEvent::tool_result(
                str_field(record, &["toolCallId", "tool_use_id", "id"]).map(str::to_string),
                &text_field(record, &["result", "output", "content"]).unwrap_or_default(),
            )),
            "step_finish" | "done" => {
                f64_field(record, &["cost", "total_cost_usd"]).map(|cost| {
                    CanonicalEvent::CostUpdate {
                        total_cost_usd: cost,
                    }
                })
            }
            other => {
                debug!(event_type = other, "ignoring unrecognised opencode record");
                None
            }
        };
        event.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn translate(record: Value) -> Vec<CanonicalEvent> {
        OpencodeBackend::new().translate(&record)
    }

    #[test]
    fn tool_call_uses_camel_case_fields() {
        let events = translate(json!({
            "type": "tool-call",
            "toolCallId": "c1",
            "toolName": "WebFetch",
            "args": {"url": "https://example.com"}
        }));
        assert_eq!(
            events,
            vec![CanonicalEvent::ToolUse {
                id: Some("c1".into()),
                tool: "webfetch".into(),
                input: json!({"url": "https://example.com"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            }]
        );
    }

    #[test]
    fn tool_result_renders_structured_output() {
        let events = translate(json!({
            "type": "tool-result",
            "toolCallId": "c1",
            "result": {"files": ["a.rs"]}
        }));
        assert_eq!(
            events,
            vec![CanonicalEvent::ToolResult {
                id: Some("c1".into()),
                output: r#"{"files":["a.rs"]}"#.into(),
            }]
        );
    }

    #[test]
    fn tool_result_without_payload_is_empty_output() {
        let events = translate(json!({"type": "tool-result", "toolCallId": "c2"}));
        assert_eq!(
            events,
            vec![CanonicalEvent::ToolResult {
                id: Some("c2".into()),
                output: String::new(),
            }]
        );
    }

    #[test]
    fn reasoning_maps_to_thinking() {
        assert_eq!(
            translate(json!({"type": "reasoning", "text": "step 1"})),
            vec![CanonicalEvent::Thinking {
                text: "step 1".into()
            }]
        );
    }

    #[test]
    fn step_finish_carries_cost() {
        assert_eq!(
            translate(json!({"type": "step_finish", "cost": 0.003, "tokens": {"input": 5}})),
            vec![CanonicalEvent::CostUpdate {
                total_cost_usd: 0.003
            }]
        );
        assert!(translate(json!({"type": "step_finish"})).is_empty());
    }

    #[test]
    fn text_record_and_unknown_type() {
        assert_eq!(
            translate(json!({"type": "text", "text": "ok"})),
            vec![CanonicalEvent::TextDelta { text: "ok".into() }]
        );
        assert!(translate(json!({"type": "step_start"})).is_empty());
    }

    #[test]
    fn invocation_puts_prompt_last() {
        let inv = OpencodeBackend::with_binary("/bin/oc").invocation("q?");
        assert_eq!(inv.program, "/bin/oc");
        assert_eq!(&inv.args[..3], ["run", "--format", "json"]);
        assert!(inv.args[3].ends_with("q?"));
    }
}
