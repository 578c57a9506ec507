//! JSON projections over the registry and the history store.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

use db::models::{ExecutionRow, WorkflowStats};
use engine::RuntimeWorkflowInfo;

use crate::AppState;

pub async fn active(State(state): State<AppState>) -> Json<Vec<RuntimeWorkflowInfo>> {
    Json(state.registry.all())
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub workflow: Option<String>,
    pub limit: Option<i64>,
}

pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ExecutionRow>>, StatusCode> {
    let limit = params.limit.unwrap_or(50).clamp(1, 1000);
    let result = match &params.workflow {
        Some(workflow) => {
            db::repository::executions::workflow_history(&state.pool, workflow, limit).await
        }
        None => db::repository::executions::all_history(&state.pool, limit).await,
    };

    result.map(Json).map_err(|error| {
        tracing::error!(%error, "failed to query execution history");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[derive(Deserialize)]
pub struct StatsParams {
    pub days: Option<i64>,
}

pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<Vec<WorkflowStats>>, StatusCode> {
    let days = params.days.unwrap_or(7).clamp(1, 365);
    let since = Utc::now() - ChronoDuration::days(days);

    db::repository::executions::stats_for_all(&state.pool, since)
        .await
        .map(Json)
        .map_err(|error| {
            tracing::error!(%error, "failed to query workflow stats");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

#[derive(Deserialize)]
pub struct FailureParams {
    pub hours: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn failures(
    State(state): State<AppState>,
    Query(params): Query<FailureParams>,
) -> Result<Json<Vec<ExecutionRow>>, StatusCode> {
    let hours = params.hours.unwrap_or(24).clamp(1, 24 * 365);
    let limit = params.limit.unwrap_or(50).clamp(1, 1000);
    let since = Utc::now() - ChronoDuration::hours(hours);

    db::repository::executions::failed_executions(&state.pool, since, limit)
        .await
        .map(Json)
        .map_err(|error| {
            tracing::error!(%error, "failed to query failed executions");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
