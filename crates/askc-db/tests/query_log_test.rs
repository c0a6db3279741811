//! Integration tests for the query log.

use serde_json::json;
use sqlx::SqlitePool;

use askc_db::queries::query_log::{self, MAX_QUESTION_CHARS, NewQuery};

fn new_query<'a>(cost_usd: f64, question: &'a str, log: &'a [serde_json::Value]) -> NewQuery<'a> {
    NewQuery {
        cost_usd,
        question,
        answer: "an answer",
        log,
        suggested: None,
    }
}

/// Move a row's timestamp `days` days into the past.
async fn backdate(db: &SqlitePool, id: i64, days: i64) {
    let at = chrono::Utc::now() - chrono::Duration::days(days);
    sqlx::query("UPDATE queries SET timestamp = ?1 WHERE id = ?2")
        .bind(at)
        .bind(id)
        .execute(db)
        .await
        .unwrap();
}

#[tokio::test]
async fn record_then_fetch_by_id() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    let log = vec![
        json!({"type": "tool_use", "id": "t1", "tool": "bash", "input": {"command": "ls"}}),
        json!({"type": "tool_result", "id": "t1", "output": "file.txt"}),
    ];

    let id = query_log::record(
        &db,
        &NewQuery {
            cost_usd: 0.0042,
            question: "what is here?",
            answer: "Done.",
            log: &log,
            suggested: Some("ls -la"),
        },
    )
    .await
    .unwrap();

    let record = query_log::query_by_id(&db, id).await.unwrap().expect("row exists");
    assert_eq!(record.id, id);
    assert_eq!(record.cost_usd, 0.0042);
    assert_eq!(record.question, "what is here?");
    assert_eq!(record.answer, "Done.");
    assert_eq!(record.log.0, log);
    assert_eq!(record.suggested.as_deref(), Some("ls -la"));
    assert!(!record.script_run);
    let age = chrono::Utc::now() - record.timestamp;
    assert!(age.num_seconds() < 60, "timestamp should be recent");
}

#[tokio::test]
async fn query_by_id_missing_is_none() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    assert!(query_log::query_by_id(&db, 999).await.unwrap().is_none());
}

#[tokio::test]
async fn long_questions_are_truncated_by_characters() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    let question = "é".repeat(MAX_QUESTION_CHARS + 50);

    let id = query_log::record(&db, &new_query(0.01, &question, &[])).await.unwrap();

    let record = query_log::query_by_id(&db, id).await.unwrap().unwrap();
    assert_eq!(record.question.chars().count(), MAX_QUESTION_CHARS);
    assert!(record.log.0.is_empty());
}

#[tokio::test]
async fn mark_script_run_sets_flag() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    let id = query_log::record(&db, &new_query(0.01, "q", &[])).await.unwrap();

    assert!(query_log::mark_script_run(&db, id).await.unwrap());
    assert!(query_log::query_by_id(&db, id).await.unwrap().unwrap().script_run);

    assert!(!query_log::mark_script_run(&db, id + 100).await.unwrap());
}

#[tokio::test]
async fn recent_queries_newest_first_and_limited() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    for q in ["first", "second", "third"] {
        query_log::record(&db, &new_query(0.01, q, &[])).await.unwrap();
    }

    let recent = query_log::recent_queries(&db, 2).await.unwrap();
    let questions: Vec<_> = recent.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(questions, vec!["third", "second"]);

    assert_eq!(query_log::recent_queries(&db, 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn total_usage_respects_window() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    query_log::record(&db, &new_query(0.25, "recent", &[])).await.unwrap();
    query_log::record(&db, &new_query(0.5, "recent too", &[])).await.unwrap();
    let old = query_log::record(&db, &new_query(10.0, "old", &[])).await.unwrap();
    backdate(&db, old, 45).await;

    let total = query_log::total_usage(&db, 30).await.unwrap();
    assert_eq!(total.queries, 2);
    assert!((total.cost_usd - 0.75).abs() < 1e-9);

    let all = query_log::total_usage(&db, 60).await.unwrap();
    assert_eq!(all.queries, 3);
}

#[tokio::test]
async fn total_usage_of_empty_log_is_zero() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    let total = query_log::total_usage(&db, 30).await.unwrap();
    assert_eq!(total.queries, 0);
    assert_eq!(total.cost_usd, 0.0);
}

#[tokio::test]
async fn daily_usage_groups_by_day_newest_first() {
    let (db, _dir) = askc_test_utils::create_test_db().await;
    query_log::record(&db, &new_query(0.1, "today", &[])).await.unwrap();
    query_log::record(&db, &new_query(0.2, "today again", &[])).await.unwrap();
    let earlier = query_log::record(&db, &new_query(0.4, "three days ago", &[])).await.unwrap();
    backdate(&db, earlier, 3).await;
    let ancient = query_log::record(&db, &new_query(9.0, "ten days ago", &[])).await.unwrap();
    backdate(&db, ancient, 10).await;

    let days = query_log::daily_usage(&db, 7).await.unwrap();
    assert_eq!(days.len(), 2, "got {days:?}");
    assert!(days[0].day > days[1].day, "newest day first: {days:?}");
    assert_eq!(days[0].queries, 2);
    assert!((days[0].cost_usd - 0.3).abs() < 1e-9);
    assert_eq!(days[1].queries, 1);
    assert!((days[1].cost_usd - 0.4).abs() < 1e-9);
}
