//! Query service: run a question through a backend and log what it cost.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use askc_db::queries::query_log::{self, NewQuery};

use crate::backend::{
    BackendRegistry, QueryCallbacks, QueryError, QueryOptions, QueryResult, ToolEvent, run_query,
};
use crate::suggestion::{self, Suggestion};

/// One answered query, as handed to a [`QueryLog`].
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    pub cost_usd: f64,
    pub question: &'a str,
    pub answer: &'a str,
    pub tool_events: &'a [ToolEvent],
    pub suggestion: Option<&'a str>,
}

/// Where answered queries are recorded.
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Persist `entry`, returning its id.
    async fn record(&self, entry: &LogEntry<'_>) -> anyhow::Result<i64>;
}

#[async_trait]
impl QueryLog for SqlitePool {
    async fn record(&self, entry: &LogEntry<'_>) -> anyhow::Result<i64> {
        let log = tool_events_json(entry.tool_events)?;
        query_log::record(
            self,
            &NewQuery {
                cost_usd: entry.cost_usd,
                question: entry.question,
                answer: entry.answer,
                log: &log,
                suggested: entry.suggestion,
            },
        )
        .await
    }
}

/// Serialize tool events into the JSON objects stored in the log.
pub fn tool_events_json(events: &[ToolEvent]) -> serde_json::Result<Vec<Value>> {
    events.iter().map(serde_json::to_value).collect()
}

/// The outcome of [`ask`].
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub result: QueryResult,
    /// The suggestion block found in the answer, if any.
    pub suggestion: Option<Suggestion>,
    /// Id of the log entry. `None` when the backend reported no cost, no log
    /// was given, or recording failed.
    pub query_id: Option<i64>,
}

/// Ask `question` of the backend named `backend`.
///
/// An unknown name is rejected before any process is spawned. A resolved
/// query with a known cost is recorded in `log` exactly once; a failure to
/// record is logged and does not reject the query. Rejected queries are
/// never recorded.
pub async fn ask(
    registry: &BackendRegistry,
    backend: &str,
    question: &str,
    callbacks: &mut QueryCallbacks<'_>,
    options: &QueryOptions,
    log: Option<&dyn QueryLog>,
) -> Result<AskOutcome, QueryError> {
    let backend = registry.get(backend)?;
    let result = run_query(backend, question, callbacks, options).await?;
    let suggestion = suggestion::extract(&result.answer);

    let query_id = match (result.cost, log) {
        (Some(cost_usd), Some(log)) => {
            let entry = LogEntry {
                cost_usd,
                question,
                answer: &result.answer,
                tool_events: &result.tool_events,
                suggestion: suggestion.as_ref().map(|s| s.body.as_str()),
            };
            match log.record(&entry).await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "failed to record query");
                    None
                }
            }
        }
        (None, _) => {
            debug!(backend = backend.name(), "no cost reported, query not recorded");
            None
        }
        (Some(_), None) => None,
    };

    Ok(AskOutcome {
        result,
        suggestion,
        query_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[test]
    fn tool_events_serialize_with_type_tags() {
        let mut input = Map::new();
        input.insert("command".into(), json!("ls"));
        let events = vec![
            ToolEvent::ToolUse {
                id: Some("t1".into()),
                tool: "bash".into(),
                input,
            },
            ToolEvent::ToolResult {
                id: None,
                output: "file.txt".into(),
            },
        ];

        assert_eq!(
            tool_events_json(&events).unwrap(),
            vec![
                json!({"type": "tool_use", "id": "t1", "tool": "bash", "input": {"command": "ls"}}),
                json!({"type": "tool_result", "output": "file.txt"}),
            ]
        );
    }

    #[test]
    fn stored_events_deserialize_back() {
        let stored = json!({"type": "tool_use", "tool": "read"});
        let event: ToolEvent = serde_json::from_value(stored).unwrap();
        assert_eq!(
            event,
            ToolEvent::ToolUse {
                id: None,
                tool: "read".into(),
                input: Map::new(),
            }
        );
    }
}
