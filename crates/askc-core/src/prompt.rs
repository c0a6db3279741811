//! The system prompt prepended to every question.

/// Tag of the fenced block carrying a single suggested shell command.
pub const SUGGESTED_COMMAND_TAG: &str = "suggested-command";
/// Tag of the fenced block carrying a suggested multi-line script.
pub const SUGGESTED_SCRIPT_TAG: &str = "suggested-script";

/// Instructions given to every backend ahead of the user's question.
pub const SYSTEM_PROMPT: &str = "You are a helpful terminal assistant. Answer the user's question. \
Use tools to search files, run commands, or search the web when needed. Keep the answer concise \
and format it as markdown.

If a follow-up action would help, end your answer with exactly ONE fenced code block:
- tagged `suggested-command` holding a single shell command the user can run to verify or \
reproduce your answer (make sure its output matches what you described), or
- tagged `suggested-script` holding a complete bash script for diagnostic or multi-step tasks.

Never include both.";

/// Build the full prompt sent to a backend: system prompt, blank line, question.
pub fn compose_prompt(question: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\n{question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_follows_system_prompt() {
        let prompt = compose_prompt("what is in /tmp?");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("\n\nwhat is in /tmp?"));
    }

    #[test]
    fn prompt_names_both_suggestion_tags() {
        assert!(SYSTEM_PROMPT.contains(SUGGESTED_COMMAND_TAG));
        assert!(SYSTEM_PROMPT.contains(SUGGESTED_SCRIPT_TAG));
    }
}
