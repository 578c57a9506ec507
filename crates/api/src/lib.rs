//! `api` crate — the embedded HTTP surface.
//!
//! A read-only, unauthenticated projection of runtime state:
//!   GET /health                  — liveness probe
//!   GET /ready                   — readiness probe (workflows loaded)
//!   GET /status                  — aggregated runtime projection
//!   GET /metrics                 — Prometheus text exposition
//!   GET /api/workflows/active    — registry snapshot
//!   GET /api/workflows/history   — recent executions
//!   GET /api/workflows/stats     — per-workflow success statistics
//!   GET /api/workflows/failures  — recent failed executions

pub mod handlers;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use db::DbPool;
use engine::WorkflowRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkflowRegistry>,
    pub pool: DbPool,
    pub prometheus: PrometheusHandle,
    /// Flipped once the agent's initial directory scan has finished.
    pub ready: Arc<AtomicBool>,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/workflows/active", get(handlers::workflows::active))
        .route("/workflows/history", get(handlers::workflows::history))
        .route("/workflows/stats", get(handlers::workflows::stats))
        .route("/workflows/failures", get(handlers::workflows::failures));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/status", get(handlers::health::status))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener up front so a port conflict is a startup-fatal error,
/// not a background surprise.
pub async fn bind(port: u16) -> Result<tokio::net::TcpListener, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("http server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve until `shutdown` fires.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
