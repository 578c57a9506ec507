//! The execution pipeline: everything that happens on one trigger firing.
//!
//! Opens the history record, walks the action chain in declared order,
//! records per-action history and metrics, then closes the record. The
//! chain does not short-circuit on failure; the aggregate status keeps the
//! first error. Persistence failures degrade observability only — the
//! execution itself carries on.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use actions::Action;
use db::models::ExecutionStatus;
use db::repository::{actions as action_repo, executions as exec_repo};

use crate::execlog::ExecutionLogLine;
use crate::metrics;
use crate::models::Workflow;
use crate::runtime::WorkflowRuntime;

/// Outcome of one pipeline run, mostly for tests and the `run` command.
#[derive(Debug)]
pub struct ExecutionSummary {
    pub execution_id: Option<i64>,
    pub status: ExecutionStatus,
    pub error: Option<String>,
}

/// Run the workflow's action chain once, end to end.
pub async fn run_once(
    runtime: &WorkflowRuntime,
    workflow: &Workflow,
    cancel: &CancellationToken,
) -> ExecutionSummary {
    let trigger_type = workflow.trigger.kind().to_string();
    let started = Instant::now();
    let mut status = ExecutionStatus::Success;
    let mut first_error: Option<String> = None;

    let execution_id =
        match exec_repo::start_workflow_execution(&runtime.pool, &workflow.name, &trigger_type)
            .await
        {
            Ok(id) => Some(id),
            Err(db_error) => {
                error!(
                    workflow_name = %workflow.name,
                    error = %db_error,
                    "failed to open workflow execution record"
                );
                None
            }
        };

    for (index, action) in workflow.actions.iter().enumerate() {
        let cancelled = run_action(
            runtime,
            workflow,
            execution_id,
            index,
            action,
            cancel,
            &mut status,
            &mut first_error,
        )
        .await;

        if cancelled {
            break;
        }
    }

    let duration = started.elapsed();
    if let Some(id) = execution_id {
        if let Err(db_error) = exec_repo::complete_workflow_execution(
            &runtime.pool,
            id,
            status,
            first_error.as_deref(),
            duration.as_millis() as i64,
        )
        .await
        {
            error!(
                workflow_name = %workflow.name,
                workflow_exec_id = id,
                error = %db_error,
                "failed to close workflow execution record"
            );
        }
    }

    metrics::record_workflow_execution(&workflow.name, &status.to_string(), duration);
    runtime.registry.update_execution_stats(
        &workflow.name,
        status == ExecutionStatus::Success,
        first_error.as_deref(),
    );

    if let Some(log) = &runtime.execution_log {
        log.append(&ExecutionLogLine {
            timestamp: chrono::Utc::now(),
            workflow_name: &workflow.name,
            trigger_type: &trigger_type,
            status: &status.to_string(),
            duration_ms: duration.as_millis() as i64,
            error: first_error.as_deref(),
        });
    }

    info!(
        workflow_name = %workflow.name,
        status = %status,
        duration_ms = duration.as_millis() as u64,
        "workflow execution finished"
    );

    ExecutionSummary {
        execution_id,
        status,
        error: first_error,
    }
}

/// Run one action to its terminal state. Returns true when the workflow was
/// cancelled mid-action and the chain should stop.
#[allow(clippy::too_many_arguments)]
async fn run_action(
    runtime: &WorkflowRuntime,
    workflow: &Workflow,
    execution_id: Option<i64>,
    index: usize,
    action: &Action,
    cancel: &CancellationToken,
    status: &mut ExecutionStatus,
    first_error: &mut Option<String>,
) -> bool {
    let action_type = action.kind().to_string();
    info!(
        workflow_name = %workflow.name,
        action_name = %action.name(),
        action_index = index,
        action_type = %action_type,
        "executing action"
    );

    let action_id = match execution_id {
        Some(exec_id) => {
            match action_repo::start_action_execution(
                &runtime.pool,
                exec_id,
                action.name(),
                &action_type,
            )
            .await
            {
                Ok(id) => Some(id),
                Err(db_error) => {
                    error!(
                        workflow_name = %workflow.name,
                        action_name = %action.name(),
                        error = %db_error,
                        "failed to open action execution record"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let action_started = Instant::now();
    let result = runtime.executor.execute(action, cancel).await;
    let elapsed = action_started.elapsed();

    let (action_status, action_error, output) = match &result {
        Ok(outcome) if outcome.is_skipped() => (ExecutionStatus::Skipped, None, None),
        Ok(outcome) => (
            ExecutionStatus::Success,
            None,
            outcome.output().map(str::to_string),
        ),
        Err(action_err) => {
            error!(
                workflow_name = %workflow.name,
                action_name = %action.name(),
                action_index = index,
                error = %action_err,
                "action failed"
            );
            *status = ExecutionStatus::Failed;
            let text = action_err.to_string();
            if first_error.is_none() {
                *first_error = Some(text.clone());
            }
            (ExecutionStatus::Failed, Some(text), None)
        }
    };

    metrics::record_action_execution(
        &workflow.name,
        action.name(),
        &action_type,
        &action_status.to_string(),
        elapsed,
    );

    if let Some(id) = action_id {
        if let Err(db_error) = action_repo::complete_action_execution(
            &runtime.pool,
            id,
            action_status,
            action_error.as_deref(),
            output.as_deref(),
            elapsed.as_millis() as i64,
        )
        .await
        {
            error!(
                workflow_name = %workflow.name,
                action_name = %action.name(),
                error = %db_error,
                "failed to close action execution record"
            );
        }
    }

    matches!(&result, Err(e) if e.is_cancellation())
}
