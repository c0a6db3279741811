//! The default command: ask a question and act on the answer.
//!
//! Answer text streams to stdout. Thinking, tool status, cost, and the
//! suggestion prompt go to stderr so the answer can be piped cleanly.

use std::collections::HashMap;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use anyhow::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::io::BufReader;
use tracing::warn;

use askc_core::backend::{BackendRegistry, QueryCallbacks, QueryOptions, ToolEvent, run_query};
use askc_core::service::{QueryLog, ask};
use askc_core::suggestion::Suggestion;
use askc_db::pool;
use askc_db::queries::query_log;

use crate::config::AskcConfig;
use crate::render::{format_cost, one_line, output_preview, tool_status, truncate_display};
use crate::script::{self, Choice};

#[derive(Debug, Clone, Copy, Default)]
pub struct AskFlags {
    /// Answer only: no status lines, no cost, no suggestion prompt.
    pub print: bool,
    /// Echo every raw backend record to stderr.
    pub debug: bool,
}

/// Write answer text to stdout as it arrives.
fn print_text(text: &str) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

/// Turns live events into the status lines shown while a query runs.
#[derive(Debug, Default)]
struct StatusLines {
    quiet: bool,
    /// Bash commands still waiting for their output, by tool-use id.
    pending_commands: HashMap<String, String>,
}

impl StatusLines {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Default::default()
        }
    }

    fn thinking(&self, text: &str) -> Option<String> {
        let text = text.trim();
        (!self.quiet && !text.is_empty()).then(|| format!("  thinking: {}", one_line(text, 80)))
    }

    fn tool_use(&mut self, event: &ToolEvent) -> Option<String> {
        let ToolEvent::ToolUse { id, tool, input } = event else {
            return None;
        };
        if self.quiet {
            return None;
        }
        if let (Some(id), "bash") = (id, tool.as_str()) {
            let command = input.get("command").and_then(Value::as_str).unwrap_or("");
            self.pending_commands.insert(id.clone(), command.to_string());
        }
        Some(format!("  {}", tool_status(tool, input)))
    }

    /// Show the first line of output for bash commands only.
    fn tool_result(&mut self, event: &ToolEvent) -> Option<String> {
        let ToolEvent::ToolResult {
            id: Some(id),
            output,
        } = event
        else {
            return None;
        };
        let command = self.pending_commands.remove(id)?;
        let preview = output_preview(output)?;
        (!self.quiet).then(|| format!("  $ {} -> {preview}", truncate_display(&command, 40)))
    }
}

/// Run the ask command.
pub async fn run_ask(config: &AskcConfig, question: &str, flags: AskFlags) -> Result<()> {
    let registry = BackendRegistry::with_binaries(&config.binaries);
    let db = match pool::open(&config.db_config).await {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "query log unavailable, continuing without it");
            None
        }
    };
    let options = QueryOptions {
        debug: flags.debug,
        timeout: config.timeout,
    };

    let status = Mutex::new(StatusLines::new(flags.print));
    let emit = |line: Option<String>| {
        if let Some(line) = line {
            eprintln!("{line}");
        }
    };

    let mut callbacks = QueryCallbacks::new()
        .on_text_delta(print_text)
        .on_thinking(|text| emit(lock(&status).thinking(text)))
        .on_tool_use(|event| emit(lock(&status).tool_use(event)))
        .on_tool_result(|event| emit(lock(&status).tool_result(event)));
    if flags.debug {
        let backend = config.backend.clone();
        callbacks = callbacks.on_raw_event(move |raw| eprintln!("[{backend}] {raw}"));
    }

    let log = db.as_ref().map(|db| db as &dyn QueryLog);
    let outcome = ask(&registry, &config.backend, question, &mut callbacks, &options, log).await;
    drop(callbacks);
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(db) = db {
                db.close().await;
            }
            return Err(e.into());
        }
    };

    let answer = &outcome.result.answer;
    if !answer.is_empty() && !answer.ends_with('\n') {
        println!();
    }

    if !flags.print {
        if answer.trim().is_empty() {
            eprintln!("No response received.");
        }
        match outcome.result.cost {
            Some(cost) => eprintln!("  {}", format_cost(cost)),
            None => eprintln!("  (cost not reported)"),
        }

        if let Some(suggestion) = &outcome.suggestion {
            if std::io::stdin().is_terminal() {
                let followup = Followup {
                    registry: &registry,
                    backend: &config.backend,
                    options: &options,
                    db: db.as_ref(),
                    query_id: outcome.query_id,
                };
                followup.interact(suggestion).await?;
            }
        }
    }

    if let Some(db) = db {
        db.close().await;
    }
    Ok(())
}

fn lock(status: &Mutex<StatusLines>) -> std::sync::MutexGuard<'_, StatusLines> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything needed to act on a suggestion after the answer.
struct Followup<'a> {
    registry: &'a BackendRegistry,
    backend: &'a str,
    options: &'a QueryOptions,
    db: Option<&'a SqlitePool>,
    query_id: Option<i64>,
}

impl Followup<'_> {
    async fn interact(&self, suggestion: &Suggestion) -> Result<()> {
        let multiline = suggestion.is_multiline();
        if multiline {
            eprintln!("  -> script ready");
        } else {
            eprintln!("  -> {}", suggestion.body);
        }

        let mut stdin = BufReader::new(tokio::io::stdin());
        loop {
            eprint!("\n{}", script::menu(multiline));
            let _ = std::io::stderr().flush();
            let reply = script::read_reply(&mut stdin).await?;

            match Choice::parse(&reply, multiline) {
                Some(Choice::Run) => {
                    self.run(suggestion).await?;
                    break;
                }
                Some(Choice::Preview) => {
                    println!();
                    print!("{}", script::preview(&suggestion.body));
                }
                Some(Choice::Analyze) => self.analyze(suggestion).await,
                Some(Choice::Save) => {
                    let default = script::default_save_path(suggestion.language());
                    eprint!("Save to (default: {}): ", default.display());
                    let _ = std::io::stderr().flush();
                    let reply = script::read_reply(&mut stdin).await?;
                    let path = if reply.is_empty() {
                        default
                    } else {
                        reply.into()
                    };
                    script::save(suggestion, &path).await?;
                    eprintln!("Saved to {}", path.display());
                    break;
                }
                Some(Choice::Quit) => break,
                None => eprintln!("Invalid choice"),
            }
        }
        Ok(())
    }

    async fn run(&self, suggestion: &Suggestion) -> Result<()> {
        eprintln!("Running {} script...\n", suggestion.language());
        let status = script::run_suggestion(suggestion).await?;
        if !status.success() {
            eprintln!("\nScript exited with {status}");
        }

        if let (Some(db), Some(id)) = (self.db, self.query_id) {
            if let Err(e) = query_log::mark_script_run(db, id).await {
                warn!(error = %format!("{e:#}"), id, "failed to mark suggestion as run");
            }
        }
        Ok(())
    }

    /// Ask the same backend to rate the suggestion's safety. Failures are
    /// reported and the prompt is shown again.
    async fn analyze(&self, suggestion: &Suggestion) {
        let backend = match self.registry.get(self.backend) {
            Ok(backend) => backend,
            Err(e) => {
                eprintln!("analysis failed: {e}");
                return;
            }
        };

        eprintln!("Analyzing...\n");
        let mut callbacks = QueryCallbacks::new().on_text_delta(print_text);
        let question = script::analysis_question(suggestion);
        match run_query(backend, &question, &mut callbacks, self.options).await {
            Ok(result) => {
                if !result.answer.ends_with('\n') {
                    println!();
                }
            }
            Err(e) => eprintln!("analysis failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn bash_use(id: &str, command: &str) -> ToolEvent {
        ToolEvent::ToolUse {
            id: Some(id.into()),
            tool: "bash".into(),
            input: json!({"command": command}).as_object().cloned().unwrap(),
        }
    }

    fn result(id: &str, output: &str) -> ToolEvent {
        ToolEvent::ToolResult {
            id: Some(id.into()),
            output: output.into(),
        }
    }

    #[test]
    fn tool_use_shows_status_line() {
        let mut status = StatusLines::new(false);
        assert_eq!(
            status.tool_use(&bash_use("t1", "df -h")).as_deref(),
            Some("  Running (df -h)")
        );
        let read = ToolEvent::ToolUse {
            id: None,
            tool: "read".into(),
            input: json!({"file_path": "/a/b.txt"}).as_object().cloned().unwrap(),
        };
        assert_eq!(status.tool_use(&read).as_deref(), Some("  Reading (b.txt)"));
    }

    #[test]
    fn bash_output_is_paired_with_its_command() {
        let mut status = StatusLines::new(false);
        status.tool_use(&bash_use("t1", "df -h"));

        assert_eq!(
            status.tool_result(&result("t1", "Filesystem Size\n/dev/sda1 100G")).as_deref(),
            Some("  $ df -h -> Filesystem Size...")
        );
        assert_eq!(
            status.tool_result(&result("t1", "again")),
            None,
            "each command's output is shown once"
        );
    }

    #[test]
    fn results_of_other_tools_are_not_shown() {
        let mut status = StatusLines::new(false);
        assert_eq!(status.tool_result(&result("r1", "contents")), None);
        let anonymous = ToolEvent::ToolResult {
            id: None,
            output: "x".into(),
        };
        assert_eq!(status.tool_result(&anonymous), None);
    }

    #[test]
    fn quiet_mode_prints_nothing() {
        let mut status = StatusLines::new(true);
        assert_eq!(status.tool_use(&bash_use("t1", "ls")), None);
        assert_eq!(status.tool_result(&result("t1", "a")), None);
        assert_eq!(status.thinking("pondering"), None);
    }

    #[test]
    fn thinking_is_flattened() {
        let status = StatusLines::new(false);
        assert_eq!(
            status.thinking(" first\nsecond ").as_deref(),
            Some("  thinking: first second")
        );
        assert_eq!(status.thinking("   "), None);
    }

    #[test]
    fn tool_use_ignores_results() {
        let mut status = StatusLines::new(false);
        assert_eq!(status.tool_use(&result("t1", "x")), None);
        let unknown = ToolEvent::ToolUse {
            id: None,
            tool: "todowrite".into(),
            input: Map::new(),
        };
        assert_eq!(status.tool_use(&unknown).as_deref(), Some("  todowrite..."));
    }
}
