//! `autoflow agent [dir]` — supervise every workflow in a directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use engine::execlog::ExecutionLogDir;
use engine::{metrics, Agent, AgentOptions, WorkflowRuntime};

use super::run::wait_for_shutdown_signal;

pub async fn execute(
    dir: PathBuf,
    watch: bool,
    log_dir: Option<PathBuf>,
    http_port: u16,
    dry_run: bool,
    db: PathBuf,
) -> i32 {
    if dry_run {
        info!("[dry run] no workflows will be executed");
    }

    info!(
        workflow_directory = %dir.display(),
        hot_reload = watch,
        http_port,
        dry_run,
        "starting autoflow agent"
    );

    let pool = match super::open_store(&db).await {
        Some(pool) => pool,
        None => return 2,
    };

    let mut runtime = WorkflowRuntime::new(pool.clone());
    if let Some(log_dir) = &log_dir {
        match ExecutionLogDir::new(log_dir) {
            Ok(sink) => {
                info!(log_directory = %log_dir.display(), "per-workflow execution logging enabled");
                runtime = runtime.with_execution_log(sink);
            }
            Err(io_error) => {
                error!(
                    directory = %log_dir.display(),
                    error = %io_error,
                    "failed to create log directory"
                );
                return 2;
            }
        }
    }
    let runtime = Arc::new(runtime);

    let agent = Agent::new(
        runtime.clone(),
        AgentOptions {
            workflow_dir: dir,
            watch,
            dry_run,
        },
    );

    if dry_run {
        // Plan only: no HTTP surface, no triggers.
        return match agent.start().await {
            Ok(()) => {
                info!("[dry run] dry run complete, no workflows were started");
                0
            }
            Err(scan_error) => {
                error!(error = %scan_error, "failed to scan workflow directory");
                2
            }
        };
    }

    // Metrics recorder and HTTP surface come up before the first task; a
    // port conflict is startup-fatal.
    let prometheus = match metrics::install_prometheus() {
        Ok(handle) => handle,
        Err(message) => {
            error!(error = %message, "failed to install metrics recorder");
            return 2;
        }
    };

    let listener = match api::bind(http_port).await {
        Ok(listener) => listener,
        Err(bind_error) => {
            error!(port = http_port, error = %bind_error, "failed to bind http port");
            return 2;
        }
    };

    let ready = Arc::new(AtomicBool::new(false));
    let server_shutdown = CancellationToken::new();
    let server = tokio::spawn(api::serve(
        listener,
        api::AppState {
            registry: runtime.registry.clone(),
            pool: pool.clone(),
            prometheus,
            ready: ready.clone(),
            started_at: Instant::now(),
        },
        server_shutdown.clone(),
    ));

    if let Err(start_error) = agent.start().await {
        error!(error = %start_error, "failed to start agent");
        server_shutdown.cancel();
        let _ = server.await;
        return 2;
    }
    ready.store(true, Ordering::Relaxed);

    info!("autoflow agent is running, press ctrl-c to stop");
    wait_for_shutdown_signal().await;
    info!("received shutdown signal, gracefully stopping all workflows");

    agent.shutdown().await;

    server_shutdown.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(serve_error)) => error!(error = %serve_error, "http server error"),
        Err(join_error) => error!(%join_error, "http server task panicked"),
    }

    pool.close().await;
    info!("autoflow agent stopped successfully");
    0
}
