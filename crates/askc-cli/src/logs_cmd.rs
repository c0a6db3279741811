//! `askc logs` command: show recent questions, the tools used, and answers.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::Local;
use sqlx::SqlitePool;
use tracing::debug;

use askc_core::backend::ToolEvent;
use askc_core::suggestion;
use askc_db::models::QueryRecord;
use askc_db::queries::query_log;

use crate::render::{format_cost, one_line, output_preview, tool_detail, truncate_display};

/// Run the logs command: the `limit` most recent queries, or one query in
/// full when `id` is given.
pub async fn run_logs(pool: &SqlitePool, limit: u32, id: Option<i64>) -> Result<()> {
    if let Some(id) = id {
        let record = query_log::query_by_id(pool, id)
            .await?
            .with_context(|| format!("query {id} not found"))?;
        print!("{}", format_full(&record));
        return Ok(());
    }

    let records = query_log::recent_queries(pool, limit).await?;
    if records.is_empty() {
        println!("No queries logged yet.");
        return Ok(());
    }
    for record in &records {
        println!("{}", format_summary(record));
    }
    Ok(())
}

/// Decode the stored tool log, skipping entries that no longer parse.
fn tool_events(record: &QueryRecord) -> Vec<ToolEvent> {
    record
        .log
        .0
        .iter()
        .filter_map(|v| match serde_json::from_value(v.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(id = record.id, error = %e, "skipping unreadable tool log entry");
                None
            }
        })
        .collect()
}

fn header(record: &QueryRecord, question: &str) -> String {
    let when = record.timestamp.with_timezone(&Local).format("%b %d %H:%M");
    format!(
        "#{} [{when}] {} \"{question}\"",
        record.id,
        format_cost(record.cost_usd)
    )
}

fn script_status(record: &QueryRecord) -> &'static str {
    if record.script_run { "(run)" } else { "(not run)" }
}

/// Compact multi-line view of one query.
pub fn format_summary(record: &QueryRecord) -> String {
    let mut out = header(record, &one_line(&record.question, 60));
    out.push('\n');

    for event in tool_events(record) {
        match event {
            ToolEvent::ToolUse { tool, input, .. } => {
                let _ = writeln!(out, "  -> {tool}({})", tool_detail(&tool, &input));
            }
            ToolEvent::ToolResult { output, .. } => {
                if let Some(preview) = output_preview(&output) {
                    let _ = writeln!(out, "     {}", one_line(&preview, 80));
                }
            }
        }
    }

    // The suggestion gets its own line below.
    let answer = suggestion::strip(&record.answer);
    if !answer.trim().is_empty() {
        let _ = writeln!(out, "  answer: {}", one_line(answer.trim(), 100));
    }
    if let Some(suggested) = record.suggested.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(
            out,
            "  suggested: {} {}",
            one_line(suggested, 50),
            script_status(record)
        );
    }
    out
}

/// Everything stored for one query.
pub fn format_full(record: &QueryRecord) -> String {
    let mut out = header(record, &record.question);
    out.push_str("\n\n");

    let events = tool_events(record);
    if !events.is_empty() {
        out.push_str("Tools:\n");
        for event in &events {
            match event {
                ToolEvent::ToolUse { tool, input, .. } => {
                    let _ = writeln!(out, "  -> {tool}({})", tool_detail(tool, input));
                }
                ToolEvent::ToolResult { output, .. } => {
                    for line in output.trim().lines() {
                        let _ = writeln!(out, "     {}", truncate_display(line, 120));
                    }
                }
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", record.answer.trim_end());
    if let Some(suggested) = record.suggested.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "\nSuggested {}:\n{suggested}", script_status(record));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::types::Json;

    fn record() -> QueryRecord {
        QueryRecord {
            id: 7,
            timestamp: Utc::now(),
            cost_usd: 0.0042,
            question: "which process is using port 8080?".into(),
            answer: "It is nginx.\n\nSee below.".into(),
            log: Json(vec![
                json!({"type": "tool_use", "id": "t1", "tool": "bash", "input": {"command": "lsof -i :8080"}}),
                json!({"type": "tool_result", "id": "t1", "output": "nginx 123 root\nnginx 124 www"}),
                json!({"type": "something_else"}),
            ]),
            suggested: Some("lsof -i :8080".into()),
            script_run: false,
        }
    }

    #[test]
    fn summary_lists_tools_answer_and_suggestion() {
        let text = format_summary(&record());
        assert!(text.starts_with("#7 ["), "got: {text}");
        assert!(text.contains("$0.0042 \"which process is using port 8080?\""));
        assert!(text.contains("  -> bash(lsof -i :8080)"));
        assert!(text.contains("     nginx 123 root..."));
        assert!(text.contains("  answer: It is nginx.  See below."));
        assert!(text.contains("  suggested: lsof -i :8080 (not run)"));
    }

    #[test]
    fn summary_skips_empty_sections() {
        let mut r = record();
        r.log = Json(vec![]);
        r.answer = String::new();
        r.suggested = None;
        let text = format_summary(&r);
        assert_eq!(text.lines().count(), 1, "got: {text}");
    }

    #[test]
    fn full_view_shows_everything() {
        let mut r = record();
        r.script_run = true;
        let text = format_full(&r);
        assert!(text.contains("Tools:\n  -> bash(lsof -i :8080)\n     nginx 123 root\n     nginx 124 www\n"));
        assert!(text.contains("It is nginx.\n\nSee below.\n"));
        assert!(text.ends_with("Suggested (run):\nlsof -i :8080\n"));
    }

    #[test]
    fn summary_answer_omits_the_suggestion_block() {
        let mut r = record();
        r.answer = "Use lsof.\n\n```suggested-command\nlsof -i :8080\n```".into();
        let text = format_summary(&r);
        assert!(text.contains("  answer: Use lsof.\n"), "got: {text}");
        assert!(!text.contains("```"));
    }

    #[test]
    fn unreadable_log_entries_are_skipped() {
        assert_eq!(tool_events(&record()).len(), 2);
    }
}
