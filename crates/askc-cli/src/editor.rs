//! Compose a question in `$EDITOR`.

use std::path::Path;

use anyhow::{Context, Result, bail};

/// Editor used when `$EDITOR` is unset.
const DEFAULT_EDITOR: &str = "vim";

/// Open `$EDITOR` on a temporary `.md` file and return its trimmed content.
///
/// Returns `None` when the user saved nothing.
pub async fn question_from_editor() -> Result<Option<String>> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    question_from(&editor).await
}

/// Run `editor` (a command line, possibly with arguments) on a fresh
/// temporary file and read the question back.
pub async fn question_from(editor: &str) -> Result<Option<String>> {
    let file = tempfile::Builder::new()
        .prefix("askc-")
        .suffix(".md")
        .tempfile()
        .context("failed to create temporary question file")?;

    edit(editor, file.path()).await?;

    let contents = tokio::fs::read_to_string(file.path())
        .await
        .context("failed to read question file")?;
    let question = contents.trim();
    Ok((!question.is_empty()).then(|| question.to_string()))
}

async fn edit(editor: &str, path: &Path) -> Result<()> {
    let mut words = editor.split_whitespace();
    let Some(program) = words.next() else {
        bail!("no editor configured");
    };

    let status = tokio::process::Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .await
        .with_context(|| format!("failed to launch editor {editor:?}"))?;

    if !status.success() {
        bail!("editor {editor:?} exited with {status}");
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use askc_test_utils::{scratch_dir, write_script};

    #[tokio::test]
    async fn reads_back_what_the_editor_wrote() {
        let dir = scratch_dir();
        let editor = write_script(
            dir.path(),
            "fake-editor",
            r#"printf '\n  why is my disk full?  \n\n' > "$1""#,
        );

        let question = question_from(&editor.to_string_lossy()).await.unwrap();
        assert_eq!(question.as_deref(), Some("why is my disk full?"));
    }

    #[tokio::test]
    async fn empty_file_is_no_question() {
        let dir = scratch_dir();
        let editor = write_script(dir.path(), "fake-editor", "true");

        assert_eq!(question_from(&editor.to_string_lossy()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn editor_arguments_come_before_the_file() {
        let dir = scratch_dir();
        let editor = write_script(dir.path(), "fake-editor", r#"printf '%s' "$1" > "$2""#);

        let command = format!("{} --wait", editor.display());
        let question = question_from(&command).await.unwrap();
        assert_eq!(question.as_deref(), Some("--wait"));
    }

    #[tokio::test]
    async fn failing_editor_is_an_error() {
        let dir = scratch_dir();
        let editor = write_script(dir.path(), "fake-editor", "exit 3");

        let err = question_from(&editor.to_string_lossy()).await.unwrap_err();
        assert!(err.to_string().contains("exited with"), "got: {err}");
    }
}
