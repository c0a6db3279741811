//! Acting on a suggested command or script: run, preview, analyze, save.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use askc_core::suggestion::{ScriptLanguage, Suggestion};

/// What the user picked at the suggestion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Run,
    Preview,
    Analyze,
    Save,
    Quit,
}

impl Choice {
    /// Parse a reply. An empty reply quits; preview and save are only
    /// offered for multi-line scripts.
    pub fn parse(reply: &str, multiline: bool) -> Option<Self> {
        match reply.trim().to_lowercase().as_str() {
            "r" | "run" => Some(Self::Run),
            "p" | "preview" if multiline => Some(Self::Preview),
            "a" | "analyze" => Some(Self::Analyze),
            "s" | "save" if multiline => Some(Self::Save),
            "q" | "quit" | "" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// The menu line shown after an answer that carries a suggestion.
pub fn menu(multiline: bool) -> &'static str {
    if multiline {
        "[r]un  [p]review  [a]nalyze  [s]ave  [q]uit: "
    } else {
        "[r]un  [a]nalyze  [q]uit: "
    }
}

/// Read one reply line. EOF reads as an empty reply.
pub async fn read_reply<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .await
        .context("failed to read reply")?;
    Ok(line.trim().to_string())
}

/// Execute the suggestion with its interpreter, inheriting the terminal.
pub async fn run_suggestion(suggestion: &Suggestion) -> Result<ExitStatus> {
    let language = suggestion.language();
    tokio::process::Command::new(language.as_str())
        .arg("-c")
        .arg(&suggestion.body)
        .status()
        .await
        .with_context(|| format!("failed to run {language} script"))
}

/// The body with right-aligned line numbers.
pub fn preview(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {line}\n", i + 1))
        .collect()
}

/// Question asking a backend to rate a script's safety.
pub fn analysis_question(suggestion: &Suggestion) -> String {
    let language = suggestion.language();
    format!(
        "Analyze this {language} script for safety. Rate it from 10 (completely safe, \
         read-only operations) to 0 (dangerous, could damage the system). Be concise: give \
         the rating and a 1-2 sentence explanation of what it does and any concerns. Do not \
         suggest a command or script.\n\n```{language}\n{}\n```",
        suggestion.body
    )
}

/// Default file name offered when saving.
pub fn default_save_path(language: ScriptLanguage) -> PathBuf {
    PathBuf::from(format!("script.{}", language.extension()))
}

/// Write the suggestion to `path`, executable on Unix.
pub async fn save(suggestion: &Suggestion, path: &Path) -> Result<()> {
    let mut body = suggestion.body.clone();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}
