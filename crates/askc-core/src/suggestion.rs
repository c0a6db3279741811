//! Follow-up suggestions embedded in an answer.
//!
//! The system prompt asks backends to finish with one fenced block tagged
//! `suggested-command` or `suggested-script`. This module finds that block,
//! removes it for display, and guesses which interpreter a script needs.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::prompt::{SUGGESTED_COMMAND_TAG, SUGGESTED_SCRIPT_TAG};

/// Whether the backend suggested a single command or a whole script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Command,
    Script,
}

impl SuggestionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            SUGGESTED_COMMAND_TAG => Some(Self::Command),
            SUGGESTED_SCRIPT_TAG => Some(Self::Script),
            _ => None,
        }
    }
}

/// Interpreter used to run a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Bash,
    Python,
}

impl ScriptLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Python => "python",
        }
    }

    /// Default file extension when saving.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Bash => "sh",
            Self::Python => "py",
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command or script the user may choose to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub body: String,
}

impl Suggestion {
    pub fn language(&self) -> ScriptLanguage {
        detect_language(&self.body)
    }

    pub fn is_multiline(&self) -> bool {
        self.body.contains('\n')
    }
}

/// Guess the interpreter for `script`: shebang first, then a couple of
/// Python keywords, otherwise bash.
pub fn detect_language(script: &str) -> ScriptLanguage {
    let script = script.trim();
    if script.starts_with("#!/usr/bin/env python") || script.starts_with("#!/usr/bin/python") {
        return ScriptLanguage::Python;
    }
    if script.starts_with("#!") {
        return ScriptLanguage::Bash;
    }
    if script.contains("def ") || script.contains("import ") {
        return ScriptLanguage::Python;
    }
    ScriptLanguage::Bash
}

/// The last suggestion block in `answer`, if it has a non-empty body.
pub fn extract(answer: &str) -> Option<Suggestion> {
    let block = last_suggestion_block(answer)?;
    let body = answer[block.body.clone()].trim();
    if body.is_empty() {
        return None;
    }
    Some(Suggestion {
        kind: block.kind,
        body: body.to_string(),
    })
}

/// `answer` with its last suggestion block removed and trailing whitespace
/// trimmed. Answers without one are returned unchanged.
pub fn strip(answer: &str) -> String {
    match last_suggestion_block(answer) {
        Some(block) => {
            let mut out = answer[..block.span.start].trim_end().to_string();
            let rest = answer[block.span.end..].trim();
            if !rest.is_empty() {
                out.push_str("\n\n");
                out.push_str(rest);
            }
            out
        }
        None => answer.to_string(),
    }
}

struct Block {
    kind: SuggestionKind,
    /// Opening fence through closing fence.
    span: Range<usize>,
    body: Range<usize>,
}

/// Scan fenced blocks and keep the last one tagged as a suggestion. An
/// unclosed block runs to the end of the text.
fn last_suggestion_block(text: &str) -> Option<Block> {
    struct Open {
        kind: Option<SuggestionKind>,
        start: usize,
        body_start: usize,
    }

    let mut found = None;
    let mut open: Option<Open> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim();

        match open.take() {
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    let tag = info.split_whitespace().next().unwrap_or("");
                    open = Some(Open {
                        kind: SuggestionKind::from_tag(tag),
                        start: line_start,
                        body_start: offset,
                    });
                }
            }
            Some(block) if trimmed.starts_with("```") && trimmed.trim_matches('`').is_empty() => {
                if let Some(kind) = block.kind {
                    found = Some(Block {
                        kind,
                        span: block.start..offset,
                        body: block.body_start..line_start,
                    });
                }
            }
            Some(block) => open = Some(block),
        }
    }

    if let Some(Open {
        kind: Some(kind),
        start,
        body_start,
    }) = open
    {
        found = Some(Block {
            kind,
            span: start..text.len(),
            body: body_start..text.len(),
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMAND_ANSWER: &str = "There are 3 files.\n\n```suggested-command\nls -la /tmp\n```\n";

    #[test]
    fn extracts_command_block() {
        let s = extract(COMMAND_ANSWER).unwrap();
        assert_eq!(s.kind, SuggestionKind::Command);
        assert_eq!(s.body, "ls -la /tmp");
        assert!(!s.is_multiline());
        assert_eq!(s.language(), ScriptLanguage::Bash);
    }

    #[test]
    fn extracts_script_block() {
        let answer = "Run this:\n```suggested-script\n#!/bin/bash\ndf -h\nfree -m\n```";
        let s = extract(answer).unwrap();
        assert_eq!(s.kind, SuggestionKind::Script);
        assert_eq!(s.body, "#!/bin/bash\ndf -h\nfree -m");
        assert!(s.is_multiline());
    }

    #[test]
    fn ordinary_code_blocks_are_not_suggestions() {
        let answer = "Example:\n```bash\necho hi\n```\nDone.";
        assert!(extract(answer).is_none());
        assert_eq!(strip(answer), answer);
    }

    #[test]
    fn last_suggestion_wins() {
        let answer = "```suggested-command\nfirst\n```\ntext\n```suggested-script\nsecond\nthird\n```\n";
        let s = extract(answer).unwrap();
        assert_eq!(s.kind, SuggestionKind::Script);
        assert_eq!(s.body, "second\nthird");
    }

    #[test]
    fn tag_inside_ordinary_block_is_ignored() {
        let answer = "```text\n```suggested-command\n```\nafter";
        // Only a bare fence closes the `text` block, so nothing is tagged.
        assert!(extract(answer).is_none());
    }

    #[test]
    fn empty_body_is_none() {
        assert!(extract("```suggested-command\n   \n```").is_none());
    }

    #[test]
    fn unclosed_block_runs_to_end() {
        let s = extract("answer\n```suggested-command\nuptime\n").unwrap();
        assert_eq!(s.body, "uptime");
        assert_eq!(strip("answer\n```suggested-command\nuptime\n"), "answer");
    }

    #[test]
    fn strip_removes_block_and_keeps_trailing_prose() {
        assert_eq!(strip(COMMAND_ANSWER), "There are 3 files.");
        let answer = "Intro.\n```suggested-command\nls\n```\nHope that helps.";
        assert_eq!(strip(answer), "Intro.\n\nHope that helps.");
    }

    #[test]
    fn detect_language_heuristics() {
        assert_eq!(
            detect_language("#!/usr/bin/env python3\nprint(1)"),
            ScriptLanguage::Python
        );
        assert_eq!(detect_language("#!/usr/bin/python\n"), ScriptLanguage::Python);
        assert_eq!(
            detect_language("#!/bin/sh\nimport foo"),
            ScriptLanguage::Bash,
            "a non-python shebang wins over keywords"
        );
        assert_eq!(detect_language("import os\nos.getcwd()"), ScriptLanguage::Python);
        assert_eq!(detect_language("def f():\n  pass"), ScriptLanguage::Python);
        assert_eq!(detect_language("ls | wc -l"), ScriptLanguage::Bash);
    }

    #[test]
    fn language_extension_and_display() {
        assert_eq!(ScriptLanguage::Python.extension(), "py");
        assert_eq!(ScriptLanguage::Bash.extension(), "sh");
        assert_eq!(ScriptLanguage::Python.to_string(), "python");
    }
}
