//! Plain-text formatting helpers shared by the commands.

use serde_json::{Map, Value};

/// `s` cut to `max` characters, with `...` appended when anything was cut.
pub fn truncate_display(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// `s` on a single line, cut to `max` characters.
pub fn one_line(s: &str, max: usize) -> String {
    truncate_display(&s.replace('\n', " "), max)
}

pub fn format_cost(cost_usd: f64) -> String {
    format!("${cost_usd:.4}")
}

fn input_str<'a>(input: &'a Map<String, Value>, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or("")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// One-line status for a tool the backend is using right now.
pub fn tool_status(tool: &str, input: &Map<String, Value>) -> String {
    match tool {
        "bash" => format!("Running ({})", truncate_display(input_str(input, "command"), 30)),
        "read" => format!("Reading ({})", file_name(input_str(input, "file_path"))),
        "glob" | "grep" => format!("Searching ({})", truncate_display(input_str(input, "pattern"), 20)),
        "websearch" => format!("Web search ({})", truncate_display(input_str(input, "query"), 25)),
        "webfetch" => format!("Fetching ({})", truncate_display(input_str(input, "url"), 30)),
        other => format!("{other}..."),
    }
}

/// Short argument summary of a logged tool call, e.g. the command or pattern.
pub fn tool_detail(tool: &str, input: &Map<String, Value>) -> String {
    match tool {
        "bash" => truncate_display(input_str(input, "command"), 50),
        "read" => file_name(input_str(input, "file_path")).to_string(),
        "glob" | "grep" => truncate_display(input_str(input, "pattern"), 30),
        "websearch" => truncate_display(input_str(input, "query"), 30),
        "webfetch" => truncate_display(input_str(input, "url"), 30),
        _ => String::new(),
    }
}

/// First line of a tool's output, cut to 60 characters. `None` for blank output.
pub fn output_preview(output: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut lines = trimmed.lines();
    let first = lines.next().unwrap_or("");
    let mut preview = truncate_display(first, 60);
    if lines.next().is_some() && !preview.ends_with("...") {
        preview.push_str("...");
    }
    Some(preview)
}
