//! Workflow execution rows: the start/complete pair and read-only projections.

use chrono::{DateTime, Utc};

use crate::models::{ExecutionRow, ExecutionStatus, WorkflowStats};
use crate::{DbError, DbPool};

/// Insert a `running` row for a fresh firing and return its id.
pub async fn start_workflow_execution(
    pool: &DbPool,
    workflow_name: &str,
    trigger_type: &str,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO workflow_executions (workflow_name, started_at, status, trigger_type)
        VALUES (?1, ?2, 'running', ?3)
        RETURNING id
        "#,
    )
    .bind(workflow_name)
    .bind(Utc::now())
    .bind(trigger_type)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Move a `running` row to its terminal state. At-most-once: a second
/// completion of the same id returns [`DbError::AlreadyCompleted`].
pub async fn complete_workflow_execution(
    pool: &DbPool,
    id: i64,
    status: ExecutionStatus,
    error: Option<&str>,
    duration_ms: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_executions
        SET completed_at = ?1, status = ?2, error = ?3, duration_ms = ?4
        WHERE id = ?5 AND status = 'running'
        "#,
    )
    .bind(Utc::now())
    .bind(status.to_string())
    .bind(error)
    .bind(duration_ms)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::AlreadyCompleted { id });
    }
    Ok(())
}

/// Recent executions of one workflow, newest first. Includes running rows.
pub async fn workflow_history(
    pool: &DbPool,
    workflow_name: &str,
    limit: i64,
) -> Result<Vec<ExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, workflow_name, started_at, completed_at, status, error, duration_ms, trigger_type
        FROM workflow_executions
        WHERE workflow_name = ?1
        ORDER BY started_at DESC
        LIMIT ?2
        "#,
    )
    .bind(workflow_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recent executions across all workflows, newest first.
pub async fn all_history(pool: &DbPool, limit: i64) -> Result<Vec<ExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, workflow_name, started_at, completed_at, status, error, duration_ms, trigger_type
        FROM workflow_executions
        ORDER BY started_at DESC
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Failed executions since `since`, newest first.
pub async fn failed_executions(
    pool: &DbPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<ExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, workflow_name, started_at, completed_at, status, error, duration_ms, trigger_type
        FROM workflow_executions
        WHERE status = 'failed' AND started_at >= ?1
        ORDER BY started_at DESC
        LIMIT ?2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate statistics per workflow over terminal rows since `since`,
/// for the stats projection.
pub async fn stats_for_all(
    pool: &DbPool,
    since: DateTime<Utc>,
) -> Result<Vec<WorkflowStats>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64, i64, i64, Option<f64>)>(
        r#"
        SELECT
            workflow_name,
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
            AVG(duration_ms)
        FROM workflow_executions
        WHERE started_at >= ?1 AND status != 'running'
        GROUP BY workflow_name
        ORDER BY workflow_name
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, total, success, failed, avg_duration)| WorkflowStats {
            workflow_name: name,
            total_executions: total,
            success_count: success,
            failed_count: failed,
            success_rate: if total > 0 {
                success as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            avg_duration_ms: avg_duration.unwrap_or(0.0),
        })
        .collect())
}

/// Aggregate statistics for one workflow over terminal rows since `since`.
/// A workflow with no terminal rows yields zeroed stats, not an error.
pub async fn workflow_stats(
    pool: &DbPool,
    workflow_name: &str,
    since: DateTime<Utc>,
) -> Result<WorkflowStats, DbError> {
    let row = sqlx::query_as::<_, (i64, i64, i64, Option<f64>)>(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
            AVG(duration_ms)
        FROM workflow_executions
        WHERE workflow_name = ?1 AND started_at >= ?2 AND status != 'running'
        "#,
    )
    .bind(workflow_name)
    .bind(since)
    .fetch_one(pool)
    .await?;

    let (total, success, failed, avg_duration) = row;
    let success_rate = if total > 0 {
        success as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Ok(WorkflowStats {
        workflow_name: workflow_name.to_string(),
        total_executions: total,
        success_count: success,
        failed_count: failed,
        success_rate,
        avg_duration_ms: avg_duration.unwrap_or(0.0),
    })
}
