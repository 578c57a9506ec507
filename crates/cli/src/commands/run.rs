//! `autoflow run <file>` — execute one workflow's trigger until cancelled.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use engine::models::Trigger;
use engine::{parser, trigger, WorkflowRuntime};

use actions::Action;

pub async fn execute(file: PathBuf, dry_run: bool, db: PathBuf) -> i32 {
    let parsed = match parser::parse_workflow_file(&file) {
        Ok(parsed) => parsed,
        Err(parse_error) => {
            error!(file = %file.display(), error = %parse_error, "failed to parse workflow file");
            return 1;
        }
    };
    let workflow = parsed.workflow;

    info!(
        workflow_name = %workflow.name,
        trigger_type = %workflow.trigger.kind(),
        actions_count = workflow.actions.len(),
        "successfully loaded workflow"
    );

    if dry_run {
        print_plan(&workflow);
        return 0;
    }

    let pool = match super::open_store(&db).await {
        Some(pool) => pool,
        None => return 2,
    };
    let runtime = Arc::new(WorkflowRuntime::new(pool));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("received shutdown signal, stopping workflow");
        signal_cancel.cancel();
    });

    info!("autoflow is now running, press ctrl-c to stop");
    match trigger::run_workflow(runtime.clone(), Arc::new(workflow), cancel).await {
        Ok(()) => {
            runtime.pool.close().await;
            0
        }
        Err(run_error) => {
            error!(error = %run_error, "workflow failed to run");
            runtime.pool.close().await;
            1
        }
    }
}

fn print_plan(workflow: &engine::Workflow) {
    println!("[dry run] would start workflow: {}", workflow.name);
    match &workflow.trigger {
        Trigger::Cron { schedule } => {
            println!("[dry run] trigger: cron (schedule: {schedule})");
        }
        Trigger::FileWatch { path, events } => {
            println!(
                "[dry run] trigger: filewatch (path: {}, events: {:?})",
                path.display(),
                events
            );
        }
    }
    println!("[dry run] would execute {} actions:", workflow.actions.len());
    for (index, action) in workflow.actions.iter().enumerate() {
        println!(
            "[dry run]   {}. [{}] {}",
            index + 1,
            action.kind(),
            action.name()
        );
        match action {
            Action::Bash(bash) => println!("[dry run]      command: {}", bash.command),
            Action::Http(http) => println!("[dry run]      {} {}", http.method, http.url),
            Action::Custom(custom) => {
                println!("[dry run]      function: {}", custom.function_name)
            }
        }
    }
    println!("[dry run] dry run complete, no actions were executed");
}

/// Resolve on SIGINT or SIGTERM.
pub(crate) async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
