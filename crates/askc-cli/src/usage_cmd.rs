//! `askc usage` command: cost per day and over the last month.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use askc_db::models::{DailyUsage, UsageTotal};
use askc_db::queries::query_log;

use crate::render::format_cost;

const DAILY_WINDOW_DAYS: u32 = 7;
const TOTAL_WINDOW_DAYS: u32 = 30;

pub async fn run_usage(pool: &SqlitePool) -> Result<()> {
    let daily = query_log::daily_usage(pool, DAILY_WINDOW_DAYS).await?;
    let total = query_log::total_usage(pool, TOTAL_WINDOW_DAYS).await?;
    print!("{}", format_usage(&daily, &total));
    Ok(())
}

/// `2026-10-16` as `Oct 16`; anything unparsable is shown as stored.
fn pretty_day(day: &str) -> String {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_else(|_| day.to_string())
}

fn format_usage(daily: &[DailyUsage], total: &UsageTotal) -> String {
    let mut out = String::new();
    if !daily.is_empty() {
        let _ = writeln!(out, "Last {DAILY_WINDOW_DAYS} days");
        for day in daily {
            let _ = writeln!(
                out,
                "  {:<8} {:>10}  ({})",
                pretty_day(&day.day),
                format_cost(day.cost_usd),
                day.queries
            );
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{TOTAL_WINDOW_DAYS}-day total: {} ({} queries)",
        format_cost(total.cost_usd),
        total.queries
    );
    out
}
