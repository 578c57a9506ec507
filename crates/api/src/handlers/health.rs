//! Liveness, readiness, status, and metrics endpoints.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use engine::RuntimeWorkflowInfo;
use engine::WorkflowStatus;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.ready.load(Ordering::Relaxed) {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ready",
                timestamp: Utc::now(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "loading",
                timestamp: Utc::now(),
            }),
        )
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub uptime: String,
    pub workflows: WorkflowsSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct WorkflowsSummary {
    pub total: usize,
    pub active: usize,
    pub stopped: usize,
    pub errored: usize,
    pub details: Vec<RuntimeWorkflowInfo>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let details = state.registry.all();
    let active = details
        .iter()
        .filter(|w| w.status == WorkflowStatus::Active)
        .count();
    let stopped = details
        .iter()
        .filter(|w| w.status == WorkflowStatus::Stopped)
        .count();
    let errored = details
        .iter()
        .filter(|w| w.status == WorkflowStatus::Error)
        .count();

    Json(StatusResponse {
        status: "healthy",
        uptime: format_uptime(state.started_at.elapsed()),
        workflows: WorkflowsSummary {
            total: details.len(),
            active,
            stopped,
            errored,
            details,
        },
        timestamp: Utc::now(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus.render()
}

/// `1d2h3m4s`-style rendering, dropping leading zero units.
fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d{hours}h{minutes}m{seconds}s")
    } else if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_rendering() {
        assert_eq!(format_uptime(Duration::from_secs(5)), "5s");
        assert_eq!(format_uptime(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_uptime(Duration::from_secs(3_725)), "1h2m5s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d1h1m1s");
    }
}
