//! `autoflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`      — execute one workflow document until interrupted.
//! - `agent`    — discover and supervise all workflows in a directory.
//! - `validate` — parse workflow documents without executing them.
//! - `history`  — show workflow execution history.
//! - `stats`    — show statistics for one workflow.
//! - `failures` — show recent failed executions.
//!
//! Exit codes: 0 success, 1 validation/user error, 2 internal startup
//! failure.

mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "./data/autoflow.db";

#[derive(Parser)]
#[command(
    name = "autoflow",
    about = "Self-hosted, event-driven workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one workflow document until interrupted.
    Run {
        /// Path to the workflow YAML file.
        file: PathBuf,
        /// Show what would be executed without running anything.
        #[arg(long)]
        dry_run: bool,
        /// History store location.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Discover, schedule, and supervise all workflows in a directory.
    Agent {
        /// Directory containing workflow documents.
        #[arg(default_value = "./workflows")]
        dir: PathBuf,
        /// Enable hot-reload for workflow changes.
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        watch: bool,
        /// Directory for per-workflow execution log files (default: shared sink).
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// HTTP port for metrics and health endpoints.
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
        /// Show what would be started without starting workflows.
        #[arg(long)]
        dry_run: bool,
        /// History store location.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Validate workflow documents without executing them.
    Validate {
        /// Files or glob patterns to validate.
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,
    },
    /// Show workflow execution history.
    History {
        /// Filter by workflow name.
        #[arg(long)]
        workflow: Option<String>,
        /// Maximum number of records to show.
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// History store location.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Show execution statistics for one workflow.
    Stats {
        /// Workflow name.
        workflow: String,
        /// Number of days to analyse.
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// History store location.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Show recent failed workflow executions.
    Failures {
        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: i64,
        /// Maximum number of records to show.
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// History store location.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run { file, dry_run, db } => commands::run::execute(file, dry_run, db).await,
        Command::Agent {
            dir,
            watch,
            log_dir,
            http_port,
            dry_run,
            db,
        } => commands::agent::execute(dir, watch, log_dir, http_port, dry_run, db).await,
        Command::Validate { patterns, strict } => commands::validate::execute(patterns, strict),
        Command::History {
            workflow,
            limit,
            db,
        } => commands::history::execute(workflow, limit, db).await,
        Command::Stats { workflow, days, db } => {
            commands::stats::execute(workflow, days, db).await
        }
        Command::Failures { hours, limit, db } => {
            commands::failures::execute(hours, limit, db).await
        }
    };

    std::process::exit(code);
}
