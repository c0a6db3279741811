use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

/// A row of the `queries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueryRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub cost_usd: f64,
    /// The question, truncated to 500 characters.
    pub question: String,
    pub answer: String,
    /// Tool events as a JSON array of `tool_use` / `tool_result` objects.
    pub log: Json<Vec<Value>>,
    /// The suggested command or script, if the answer carried one.
    pub suggested: Option<String>,
    pub script_run: bool,
}

/// Aggregate cost over a period.
#[derive(Debug, Clone, Copy, PartialEq, FromRow, Serialize)]
pub struct UsageTotal {
    pub cost_usd: f64,
    pub queries: i64,
}

/// Aggregate cost for one local calendar day.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DailyUsage {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub cost_usd: f64,
    pub queries: i64,
}
