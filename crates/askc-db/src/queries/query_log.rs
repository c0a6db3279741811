//! Database query functions for the `queries` table.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::models::{DailyUsage, QueryRecord, UsageTotal};

/// Questions longer than this are truncated before being stored.
pub const MAX_QUESTION_CHARS: usize = 500;

/// Parameters for inserting a new query row.
#[derive(Debug, Clone)]
pub struct NewQuery<'a> {
    pub cost_usd: f64,
    pub question: &'a str,
    pub answer: &'a str,
    /// Tool events, already serialized to JSON objects.
    pub log: &'a [Value],
    pub suggested: Option<&'a str>,
}

/// Insert a query stamped with the current time. Returns the new row id.
pub async fn record(pool: &SqlitePool, new: &NewQuery<'_>) -> Result<i64> {
    let question: String = new.question.chars().take(MAX_QUESTION_CHARS).collect();

    let result = sqlx::query(
        "INSERT INTO queries (timestamp, cost_usd, question, answer, log, suggested) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(Utc::now())
    .bind(new.cost_usd)
    .bind(&question)
    .bind(new.answer)
    .bind(Json(new.log))
    .bind(new.suggested)
    .execute(pool)
    .await
    .context("failed to record query")?;

    Ok(result.last_insert_rowid())
}

/// Flag that the user ran the suggestion of query `id`.
///
/// Returns `false` if no such query exists.
pub async fn mark_script_run(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE queries SET script_run = 1 WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to mark query {id} as run"))?;

    Ok(result.rows_affected() > 0)
}

/// Total cost and query count over the last `days` days.
pub async fn total_usage(pool: &SqlitePool, days: u32) -> Result<UsageTotal> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));

    let total = sqlx::query_as::<_, UsageTotal>(
        "SELECT COALESCE(SUM(cost_usd), 0.0) AS cost_usd, COUNT(*) AS queries \
         FROM queries \
         WHERE julianday(timestamp) > julianday(?1)",
    )
    .bind(cutoff)
    .fetch_one(pool)
    .await
    .context("failed to compute total usage")?;

    Ok(total)
}

/// Cost and query count per local calendar day over the last `days` days,
/// newest day first.
pub async fn daily_usage(pool: &SqlitePool, days: u32) -> Result<Vec<DailyUsage>> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));

    let rows = sqlx::query_as::<_, DailyUsage>(
        "SELECT date(timestamp, 'localtime') AS day, \
                SUM(cost_usd) AS cost_usd, \
                COUNT(*) AS queries \
         FROM queries \
         WHERE julianday(timestamp) > julianday(?1) \
         GROUP BY day \
         ORDER BY day DESC",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .context("failed to compute daily usage")?;

    Ok(rows)
}

/// Fetch a query by its id.
pub async fn query_by_id(pool: &SqlitePool, id: i64) -> Result<Option<QueryRecord>> {
    let record = sqlx::query_as::<_, QueryRecord>("SELECT * FROM queries WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch query {id}"))?;

    Ok(record)
}

/// The `limit` most recent queries, most recent first.
pub async fn recent_queries(pool: &SqlitePool, limit: u32) -> Result<Vec<QueryRecord>> {
    let records =
        sqlx::query_as::<_, QueryRecord>("SELECT * FROM queries ORDER BY id DESC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await
            .context("failed to list recent queries")?;

    Ok(records)
}
