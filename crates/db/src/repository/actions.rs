//! Action execution rows, referencing their parent workflow execution.

use chrono::Utc;

use crate::models::{ActionExecutionRow, ExecutionStatus};
use crate::{DbError, DbPool};

/// Insert a `running` action row and return its id.
pub async fn start_action_execution(
    pool: &DbPool,
    workflow_execution_id: i64,
    action_name: &str,
    action_type: &str,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO action_executions
            (workflow_execution_id, action_name, action_type, started_at, status)
        VALUES (?1, ?2, ?3, ?4, 'running')
        RETURNING id
        "#,
    )
    .bind(workflow_execution_id)
    .bind(action_name)
    .bind(action_type)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Move a `running` action row to its terminal state.
pub async fn complete_action_execution(
    pool: &DbPool,
    id: i64,
    status: ExecutionStatus,
    error: Option<&str>,
    output: Option<&str>,
    duration_ms: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE action_executions
        SET completed_at = ?1, status = ?2, error = ?3, output = ?4, duration_ms = ?5
        WHERE id = ?6 AND status = 'running'
        "#,
    )
    .bind(Utc::now())
    .bind(status.to_string())
    .bind(error)
    .bind(output)
    .bind(duration_ms)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::AlreadyCompleted { id });
    }
    Ok(())
}

/// All action rows belonging to one workflow execution, in insertion order.
pub async fn actions_for_execution(
    pool: &DbPool,
    workflow_execution_id: i64,
) -> Result<Vec<ActionExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, ActionExecutionRow>(
        r#"
        SELECT id, workflow_execution_id, action_name, action_type, started_at,
               completed_at, status, error, duration_ms, output
        FROM action_executions
        WHERE workflow_execution_id = ?1
        ORDER BY id
        "#,
    )
    .bind(workflow_execution_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
