//! Cron trigger: sleep until the next scheduled instant, fire, repeat.
//!
//! Only one firing is active at a time; the next instant is computed after
//! the pipeline completes, so missed ticks during a long run are dropped
//! rather than queued.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::metrics;
use crate::models::Workflow;
use crate::pipeline;
use crate::runtime::WorkflowRuntime;

/// How often the registry's `next_execution` is refreshed between fires.
const NEXT_EXECUTION_REFRESH: Duration = Duration::from_secs(30);

/// Parse a cron expression, accepting the standard five-field form by
/// prepending a zero seconds field; six- and seven-field forms pass through.
pub fn parse_cron(expression: &str) -> Result<Schedule, cron::error::Error> {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        Schedule::from_str(&format!("0 {expression}"))
    } else {
        Schedule::from_str(expression)
    }
}

pub async fn run(
    runtime: &WorkflowRuntime,
    workflow: &Workflow,
    expression: &str,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let schedule = parse_cron(expression).map_err(|e| EngineError::TriggerSetup {
        workflow: workflow.name.clone(),
        message: format!("invalid cron expression '{expression}': {e}"),
    })?;

    info!(
        workflow_name = %workflow.name,
        trigger_schedule = %expression,
        "cron trigger started"
    );

    // Keep the projection's next_execution fresh even while sleeping
    // through a long gap between fires.
    let updater_cancel = cancel.child_token();
    let updater = tokio::spawn(next_execution_updater(
        runtime.registry.clone(),
        workflow.name.clone(),
        schedule.clone(),
        updater_cancel.clone(),
    ));

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            // The schedule has no future instants; nothing left to do.
            break;
        };
        runtime
            .registry
            .update_next_execution(&workflow.name, next);

        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!(
            workflow_name = %workflow.name,
            next_run = %next,
            "cron trigger sleeping until next instant"
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        metrics::record_trigger_fire(&workflow.name, "cron");
        info!(
            workflow_name = %workflow.name,
            trigger_schedule = %expression,
            "cron trigger fired"
        );

        pipeline::run_once(runtime, workflow, cancel).await;

        if cancel.is_cancelled() {
            break;
        }
    }

    updater_cancel.cancel();
    let _ = updater.await;
    info!(workflow_name = %workflow.name, "cron trigger stopped");
    Ok(())
}

async fn next_execution_updater(
    registry: std::sync::Arc<crate::registry::WorkflowRegistry>,
    workflow_name: String,
    schedule: Schedule,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(NEXT_EXECUTION_REFRESH);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {
                if let Some(next) = schedule.upcoming(Utc).next() {
                    registry.update_next_execution(&workflow_name, next);
                }
            }
        }
    }
}
