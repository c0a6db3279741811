//! Field extraction helpers shared by the adapters.
//!
//! Native schemas disagree on field names (`name` vs `toolName`,
//! `tool_use_id` vs `toolCallId`), so every helper takes a list of
//! candidate keys and uses the first one present.

use serde_json::{Map, Value};

/// The record's `type` discriminator, or `""` when absent.
pub(crate) fn record_type(record: &Value) -> &str {
    record.get("type").and_then(|t| t.as_str()).unwrap_or("")
}

/// First string-valued field among `keys`.
pub(crate) fn str_field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(|v| v.as_str()))
}

/// First numeric field among `keys`.
pub(crate) fn f64_field(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(|v| v.as_f64()))
}

/// First object-valued field among `keys`; an empty map when none is an object.
pub(crate) fn object_field(record: &Value, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(|v| v.as_object()))
        .cloned()
        .unwrap_or_default()
}

/// First present field among `keys`, rendered as display text.
///
/// Strings are used verbatim. Arrays of content blocks (`[{"type":"text",
/// "text":..}, ..]`) are joined by newlines. Anything else is rendered as
/// compact JSON. `null` counts as absent.
pub(crate) fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    let value = keys
        .iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))?;
    Some(render_text(value))
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items)
            if !items.is_empty()
                && items.iter().all(|i| i.get("text").is_some_and(Value::is_string)) =>
        {
            items
                .iter()
                .filter_map(|i| i.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        }
        other => other.to_string(),
    }
}
