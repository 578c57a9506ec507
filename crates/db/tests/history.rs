//! History store integration tests against an in-memory SQLite database.

use chrono::{Duration as ChronoDuration, Utc};

use db::models::ExecutionStatus;
use db::repository::{actions, executions};
use db::{pool, DbError, DbPool};

async fn test_pool() -> DbPool {
    let pool = pool::create_memory_pool().await.expect("memory pool");
    pool::run_migrations(&pool).await.expect("migrations");
    pool
}

#[tokio::test]
async fn start_then_complete_workflow_execution() {
    let pool = test_pool().await;

    let id = executions::start_workflow_execution(&pool, "nightly-backup", "cron")
        .await
        .unwrap();
    assert!(id > 0);

    let history = executions::workflow_history(&pool, "nightly-backup", 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "running");
    assert!(history[0].completed_at.is_none());
    assert!(history[0].duration_ms.is_none());

    executions::complete_workflow_execution(&pool, id, ExecutionStatus::Success, None, 125)
        .await
        .unwrap();

    let history = executions::workflow_history(&pool, "nightly-backup", 10)
        .await
        .unwrap();
    assert_eq!(history[0].status, "success");
    assert_eq!(history[0].duration_ms, Some(125));
    assert!(history[0].completed_at.is_some());
    assert!(history[0].error.is_none());
}

#[tokio::test]
async fn ids_are_monotonic() {
    let pool = test_pool().await;
    let first = executions::start_workflow_execution(&pool, "a", "cron")
        .await
        .unwrap();
    let second = executions::start_workflow_execution(&pool, "b", "filewatch")
        .await
        .unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn double_completion_is_rejected() {
    let pool = test_pool().await;
    let id = executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();

    executions::complete_workflow_execution(&pool, id, ExecutionStatus::Failed, Some("boom"), 10)
        .await
        .unwrap();

    let err = executions::complete_workflow_execution(&pool, id, ExecutionStatus::Success, None, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::AlreadyCompleted { .. }));
}

#[tokio::test]
async fn action_rows_reference_their_execution() {
    let pool = test_pool().await;
    let exec_id = executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();

    let a1 = actions::start_action_execution(&pool, exec_id, "step-one", "bash")
        .await
        .unwrap();
    let a2 = actions::start_action_execution(&pool, exec_id, "step-two", "http")
        .await
        .unwrap();

    actions::complete_action_execution(&pool, a1, ExecutionStatus::Success, None, Some("ok"), 5)
        .await
        .unwrap();
    actions::complete_action_execution(
        &pool,
        a2,
        ExecutionStatus::Failed,
        Some("unexpected status code 500"),
        None,
        7,
    )
    .await
    .unwrap();

    let rows = actions::actions_for_execution(&pool, exec_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].action_name, "step-one");
    assert_eq!(rows[0].output.as_deref(), Some("ok"));
    assert_eq!(rows[1].status, "failed");
    assert_eq!(rows[1].error.as_deref(), Some("unexpected status code 500"));
}

#[tokio::test]
async fn failed_query_filters_by_status_and_window() {
    let pool = test_pool().await;

    let ok = executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();
    executions::complete_workflow_execution(&pool, ok, ExecutionStatus::Success, None, 1)
        .await
        .unwrap();

    let bad = executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();
    executions::complete_workflow_execution(&pool, bad, ExecutionStatus::Failed, Some("err"), 1)
        .await
        .unwrap();

    // Still-running rows are not failures.
    executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();

    let since = Utc::now() - ChronoDuration::hours(1);
    let failures = executions::failed_executions(&pool, since, 50).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, bad);

    // A window starting in the future excludes everything.
    let future = Utc::now() + ChronoDuration::hours(1);
    let failures = executions::failed_executions(&pool, future, 50).await.unwrap();
    assert!(failures.is_empty());
}

#[tokio::test]
async fn stats_cover_only_terminal_rows() {
    let pool = test_pool().await;

    for (status, duration) in [
        (ExecutionStatus::Success, 100),
        (ExecutionStatus::Success, 200),
        (ExecutionStatus::Failed, 300),
    ] {
        let id = executions::start_workflow_execution(&pool, "wf", "cron")
            .await
            .unwrap();
        executions::complete_workflow_execution(&pool, id, status, None, duration)
            .await
            .unwrap();
    }
    // One orphaned running row, ignored by the aggregates.
    executions::start_workflow_execution(&pool, "wf", "cron")
        .await
        .unwrap();

    let since = Utc::now() - ChronoDuration::days(7);
    let stats = executions::workflow_stats(&pool, "wf", since).await.unwrap();
    assert_eq!(stats.total_executions, 3);
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.failed_count, 1);
    assert!((stats.success_rate - 66.666).abs() < 0.1);
    assert!((stats.avg_duration_ms - 200.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn stats_for_unknown_workflow_are_zeroed() {
    let pool = test_pool().await;
    let since = Utc::now() - ChronoDuration::days(7);
    let stats = executions::workflow_stats(&pool, "ghost", since).await.unwrap();
    assert_eq!(stats.total_executions, 0);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn history_respects_limit_and_order() {
    let pool = test_pool().await;
    for _ in 0..5 {
        let id = executions::start_workflow_execution(&pool, "wf", "cron")
            .await
            .unwrap();
        executions::complete_workflow_execution(&pool, id, ExecutionStatus::Success, None, 1)
            .await
            .unwrap();
    }

    let rows = executions::all_history(&pool, 3).await.unwrap();
    assert_eq!(rows.len(), 3);
    // Newest first: ids descend because started_at ties break on insertion.
    assert!(rows[0].id >= rows[1].id);
}
