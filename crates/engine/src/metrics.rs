//! Metrics recording helpers.
//!
//! Thin wrappers over the `metrics` facade so every callsite agrees on
//! names and labels. Labelled series materialise lazily on first use; the
//! Prometheus exporter renders them at `/metrics`.

use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries for the duration histograms, in seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the process-wide Prometheus recorder and hand back the render
/// handle for the HTTP surface. Call once, before the first task starts.
pub fn install_prometheus() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .map_err(|e| e.to_string())?
        .install_recorder()
        .map_err(|e| e.to_string())
}

/// One finished workflow execution.
pub fn record_workflow_execution(workflow: &str, status: &str, duration: Duration) {
    counter!(
        "autoflow_workflow_executions_total",
        "workflow" => workflow.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "autoflow_workflow_execution_duration_seconds",
        "workflow" => workflow.to_string()
    )
    .record(duration.as_secs_f64());
    gauge!(
        "autoflow_workflow_last_execution_timestamp",
        "workflow" => workflow.to_string()
    )
    .set(Utc::now().timestamp() as f64);
}

/// One finished action attempt chain, `duration` inclusive of retries.
pub fn record_action_execution(
    workflow: &str,
    action: &str,
    action_type: &str,
    status: &str,
    duration: Duration,
) {
    counter!(
        "autoflow_action_executions_total",
        "workflow" => workflow.to_string(),
        "action" => action.to_string(),
        "action_type" => action_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "autoflow_action_execution_duration_seconds",
        "workflow" => workflow.to_string(),
        "action" => action.to_string(),
        "action_type" => action_type.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_trigger_fire(workflow: &str, trigger_type: &str) {
    counter!(
        "autoflow_trigger_fires_total",
        "workflow" => workflow.to_string(),
        "trigger_type" => trigger_type.to_string()
    )
    .increment(1);
}

/// Advertise a configured workflow in the info gauge (value fixed at 1).
pub fn register_workflow_info(workflow: &str, trigger_type: &str, schedule: &str) {
    gauge!(
        "autoflow_workflow_info",
        "workflow" => workflow.to_string(),
        "trigger_type" => trigger_type.to_string(),
        "schedule" => schedule.to_string()
    )
    .set(1.0);
}

pub fn set_active_workflows(count: usize) {
    gauge!("autoflow_agent_active_workflows").set(count as f64);
}

pub fn record_agent_uptime(uptime: Duration) {
    gauge!("autoflow_agent_uptime_seconds").set(uptime.as_secs_f64());
}
