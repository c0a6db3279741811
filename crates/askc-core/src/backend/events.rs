//! Canonical event vocabulary shared by every backend.
//!
//! Each adapter translates its tool's native records into
//! [`CanonicalEvent`] values; the runner folds them into a [`QueryResult`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hard cap on the length of a tool result's output, in characters.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 1000;

/// A backend-independent event produced while a query runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalEvent {
    /// A fragment of the final answer. Concatenating every delta in order
    /// yields the answer.
    TextDelta { text: String },
    /// Intermediate reasoning. Display-only, never part of the answer.
    Thinking { text: String },
    /// The backend invoked a tool.
    ToolUse {
        id: Option<String>,
        tool: String,
        input: Map<String, Value>,
    },
    /// A tool invocation returned. `output` is at most
    /// [`MAX_TOOL_OUTPUT_CHARS`] characters.
    ToolResult { id: Option<String>, output: String },
    /// Running or final cost. Later updates supersede earlier ones.
    CostUpdate { total_cost_usd: f64 },
}

impl CanonicalEvent {
    /// Build a [`CanonicalEvent::ToolUse`], lowercasing the tool name.
    pub fn tool_use(id: Option<String>, tool: &str, input: Map<String, Value>) -> Self {
        Self::ToolUse {
            id,
            tool: tool.to_lowercase(),
            input,
        }
    }

    /// Build a [`CanonicalEvent::ToolResult`], enforcing the output cap.
    pub fn tool_result(id: Option<String>, output: &str) -> Self {
        Self::ToolResult {
            id,
            output: truncate_chars(output, MAX_TOOL_OUTPUT_CHARS),
        }
    }
}

/// A tool event as retained in [`QueryResult::tool_events`] and in the
/// persistence log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolEvent {
    ToolUse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        tool: String,
        #[serde(default)]
        input: Map<String, Value>,
    },
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        output: String,
    },
}

impl ToolEvent {
    /// The backend's correlation token, if it supplied one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::ToolUse { id, .. } | Self::ToolResult { id, .. } => id.as_deref(),
        }
    }
}

/// The terminal aggregate of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Concatenation of every text delta, in arrival order.
    pub answer: String,
    /// Last reported cost; `None` when the backend never reported one.
    pub cost: Option<f64>,
    /// Tool uses and results in arrival order.
    pub tool_events: Vec<ToolEvent>,
}

/// Truncate `s` to at most `max` characters without splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_use_lowercases_name() {
        let event = CanonicalEvent::tool_use(Some("t1".into()), "Bash", Map::new());
        match event {
            CanonicalEvent::ToolUse { tool, .. } => assert_eq!(tool, "bash"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn tool_result_output_is_capped() {
        let long = "x".repeat(MAX_TOOL_OUTPUT_CHARS + 250);
        let CanonicalEvent::ToolResult { output, .. } = CanonicalEvent::tool_result(None, &long)
        else {
            panic!("expected tool result");
        };
        assert_eq!(output.chars().count(), MAX_TOOL_OUTPUT_CHARS);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 2), "hé");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn tool_event_serializes_with_type_tag() {
        let event = ToolEvent::ToolUse {
            id: Some("t1".into()),
            tool: "bash".into(),
            input: json!({"command": "ls"}).as_object().cloned().unwrap(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "tool_use", "id": "t1", "tool": "bash", "input": {"command": "ls"}})
        );
    }

    #[test]
    fn tool_event_without_id_omits_field() {
        let event = ToolEvent::ToolResult {
            id: None,
            output: "ok".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "tool_result", "output": "ok"}));
        assert_eq!(event.id(), None);
    }

    #[test]
    fn tool_event_parses_legacy_log_entries() {
        let parsed: Vec<ToolEvent> = serde_json::from_value(json!([
            {"type": "tool_use", "tool": "read"},
            {"type": "tool_result", "id": "a", "output": "body"}
        ]))
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].id(), Some("a"));
    }
}
