//! Trigger state machines: cron and filewatch supervisors that drive the
//! execution pipeline on their own schedule.

pub mod cron;
pub mod filewatch;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::EngineError;
use crate::metrics;
use crate::models::{Trigger, Workflow};
use crate::runtime::WorkflowRuntime;

/// Run one workflow's trigger until it is cancelled or fails to set up.
///
/// Registers the workflow for the projection, dispatches to the matching
/// state machine, and updates the registry on the way out. Everything the
/// trigger spawns observes `cancel`; when this returns, nothing belonging
/// to the workflow is still scheduled.
pub async fn run_workflow(
    runtime: Arc<WorkflowRuntime>,
    workflow: Arc<Workflow>,
    cancel: CancellationToken,
) -> Result<(), EngineError> {
    runtime.registry.register(&workflow);
    metrics::register_workflow_info(
        &workflow.name,
        &workflow.trigger.kind().to_string(),
        workflow.trigger.schedule().unwrap_or(""),
    );

    let result = match &workflow.trigger {
        Trigger::Cron { schedule } => {
            cron::run(&runtime, &workflow, schedule, &cancel).await
        }
        Trigger::FileWatch { path, events } => {
            filewatch::run(&runtime, &workflow, path, events, &cancel).await
        }
    };

    match &result {
        Ok(()) => {
            runtime.registry.mark_stopped(&workflow.name);
            info!(workflow_name = %workflow.name, "workflow stopped");
        }
        Err(error) => {
            runtime.registry.mark_error(&workflow.name, &error.to_string());
        }
    }

    result
}
