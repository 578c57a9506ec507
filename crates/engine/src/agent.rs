//! Agent supervisor: discover workflow documents in a directory, own one
//! task per workflow, react to directory changes, and shut down cleanly.
//!
//! Directory events are serialised through a single consumer so cancel and
//! start never interleave for the same path. One document failing to parse
//! or start never takes the agent down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::event::{EventKind, ModifyKind};
use notify::{RecursiveMode, Watcher};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::metrics;
use crate::models::Trigger;
use crate::parser;
use crate::runtime::WorkflowRuntime;
use crate::trigger;

/// Grace period for per-workflow tasks to drain on shutdown.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(2);

/// Wait after a create/write event before parsing, so partially written
/// documents settle first.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// How often the uptime gauge is refreshed.
const UPTIME_REFRESH: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub workflow_dir: PathBuf,
    /// Enable directory hot-reload.
    pub watch: bool,
    /// Log the discovery plan without starting anything.
    pub dry_run: bool,
}

struct WorkflowHandle {
    workflow_name: String,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct AgentInner {
    runtime: Arc<WorkflowRuntime>,
    options: AgentOptions,
    root: CancellationToken,
    /// Keyed by document path; guards against interleaved cancel/start.
    tasks: Mutex<HashMap<PathBuf, WorkflowHandle>>,
    started_at: Instant,
}

/// The supervising runtime. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    pub fn new(runtime: Arc<WorkflowRuntime>, options: AgentOptions) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                runtime,
                options,
                root: CancellationToken::new(),
                tasks: Mutex::new(HashMap::new()),
                started_at: Instant::now(),
            }),
        }
    }

    pub fn runtime(&self) -> &Arc<WorkflowRuntime> {
        &self.inner.runtime
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub async fn workflow_count(&self) -> usize {
        self.inner.tasks.lock().await.len()
    }

    /// Scan the directory, start every accepted workflow, and (unless
    /// disabled) begin watching for document changes.
    ///
    /// An unreadable directory is fatal; a single bad document is logged
    /// and skipped.
    pub async fn start(&self) -> Result<(), EngineError> {
        let dir = &self.inner.options.workflow_dir;
        let dir = dir.canonicalize().map_err(|source| EngineError::ReadDir {
            dir: dir.clone(),
            source,
        })?;

        let files = discover_documents(&dir)?;
        if files.is_empty() {
            warn!(directory = %dir.display(), "no workflow files found in directory");
        } else {
            info!(
                count = files.len(),
                directory = %dir.display(),
                "discovered workflow files"
            );
        }

        if self.inner.options.dry_run {
            self.log_dry_run_plan(&files);
            return Ok(());
        }

        let mut started = 0usize;
        for file in &files {
            match self.start_workflow_file(file).await {
                Ok(()) => started += 1,
                Err(error) => {
                    error!(file = %file.display(), %error, "failed to start workflow");
                }
            }
        }
        info!(
            total = files.len(),
            successful = started,
            failed = files.len() - started,
            "workflows started"
        );
        metrics::set_active_workflows(self.workflow_count().await);

        self.spawn_uptime_updater();

        if self.inner.options.watch {
            self.spawn_directory_watcher(dir)?;
        }

        Ok(())
    }

    /// Cancel everything and wait out the drain window.
    pub async fn shutdown(&self) {
        info!("stopping all workflows");
        self.inner.root.cancel();

        let handles: Vec<WorkflowHandle> = {
            let mut tasks = self.inner.tasks.lock().await;
            tasks.drain().map(|(_, handle)| handle).collect()
        };

        let drain = async {
            for handle in handles {
                if let Err(join_error) = handle.join.await {
                    error!(
                        workflow_name = %handle.workflow_name,
                        %join_error,
                        "workflow task panicked during shutdown"
                    );
                }
            }
        };

        if tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await.is_err() {
            warn!(
                deadline = ?SHUTDOWN_DEADLINE,
                "shutdown deadline elapsed with workflow tasks still draining"
            );
        }

        metrics::set_active_workflows(0);
        info!("agent stopped");
    }

    // -----------------------------------------------------------------------
    // Per-workflow lifecycle
    // -----------------------------------------------------------------------

    async fn start_workflow_file(&self, path: &Path) -> Result<(), EngineError> {
        let parsed = parser::parse_workflow_file(path)?;
        let workflow = Arc::new(parsed.workflow);

        info!(
            file = %path.display(),
            workflow_name = %workflow.name,
            trigger_type = %workflow.trigger.kind(),
            actions_count = workflow.actions.len(),
            "starting workflow"
        );

        let cancel = self.inner.root.child_token();
        let runtime = self.inner.runtime.clone();
        let task_workflow = workflow.clone();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            if let Err(error) =
                trigger::run_workflow(runtime, task_workflow.clone(), task_cancel).await
            {
                error!(
                    workflow_name = %task_workflow.name,
                    %error,
                    "workflow trigger failed"
                );
            }
        });

        let mut tasks = self.inner.tasks.lock().await;
        if let Some(previous) = tasks.insert(
            path.to_path_buf(),
            WorkflowHandle {
                workflow_name: workflow.name.clone(),
                cancel,
                join,
            },
        ) {
            // Should have been stopped by the caller already; be safe.
            previous.cancel.cancel();
        }

        Ok(())
    }

    /// Cancel the task owning `path` and wait for it to fully stop, so a
    /// replacement cannot double-fire.
    async fn stop_workflow_file(&self, path: &Path) {
        let handle = self.inner.tasks.lock().await.remove(path);
        if let Some(handle) = handle {
            info!(
                file = %path.display(),
                workflow_name = %handle.workflow_name,
                "stopping workflow"
            );
            handle.cancel.cancel();
            if let Err(join_error) = handle.join.await {
                error!(
                    workflow_name = %handle.workflow_name,
                    %join_error,
                    "workflow task panicked"
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Hot reload
    // -----------------------------------------------------------------------

    fn spawn_directory_watcher(&self, dir: PathBuf) -> Result<(), EngineError> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })
        .map_err(|e| EngineError::ReadDir {
            dir: dir.clone(),
            source: std::io::Error::other(e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| EngineError::ReadDir {
                dir: dir.clone(),
                source: std::io::Error::other(e),
            })?;

        info!(directory = %dir.display(), "workflow hot-reload enabled");

        let agent = self.clone();
        let root = self.inner.root.clone();
        tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of the consumer.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = root.cancelled() => return,
                    received = rx.recv() => {
                        let Some(received) = received else { return };
                        match received {
                            Ok(event) => agent.handle_directory_event(event).await,
                            Err(watch_error) => {
                                error!(error = %watch_error, "workflow watcher error");
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    async fn handle_directory_event(&self, event: notify::Event) {
        for path in &event.paths {
            if !is_workflow_document(path) {
                continue;
            }

            match event.kind {
                EventKind::Create(_) => {
                    info!(file = %path.display(), operation = "create", "new workflow detected");
                    // Replace any existing task for the slot first.
                    self.stop_workflow_file(path).await;
                    tokio::time::sleep(SETTLE_DELAY).await;
                    if let Err(error) = self.start_workflow_file(path).await {
                        error!(file = %path.display(), %error, "failed to start new workflow");
                    }
                }
                EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => {
                    info!(file = %path.display(), operation = "remove", "workflow file removed");
                    self.stop_workflow_file(path).await;
                }
                EventKind::Modify(_) => {
                    info!(file = %path.display(), operation = "write", "workflow file modified");
                    self.stop_workflow_file(path).await;
                    tokio::time::sleep(SETTLE_DELAY).await;
                    match self.start_workflow_file(path).await {
                        Ok(()) => {
                            info!(file = %path.display(), "workflow reloaded successfully");
                        }
                        Err(error) => {
                            // The old task is already gone; the slot stays empty.
                            error!(file = %path.display(), %error, "failed to reload workflow");
                        }
                    }
                }
                _ => continue,
            }

            metrics::set_active_workflows(self.workflow_count().await);
        }
    }

    // -----------------------------------------------------------------------
    // Support
    // -----------------------------------------------------------------------

    fn spawn_uptime_updater(&self) {
        let root = self.inner.root.clone();
        let started_at = self.inner.started_at;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(UPTIME_REFRESH);
            loop {
                tokio::select! {
                    _ = root.cancelled() => return,
                    _ = tick.tick() => metrics::record_agent_uptime(started_at.elapsed()),
                }
            }
        });
    }

    fn log_dry_run_plan(&self, files: &[PathBuf]) {
        info!("[dry run] no workflows will be started");
        for (index, file) in files.iter().enumerate() {
            match parser::parse_workflow_file(file) {
                Ok(parsed) => {
                    let workflow = &parsed.workflow;
                    info!(
                        "[dry run] {}. {} (file: {}, trigger: {}, actions: {})",
                        index + 1,
                        workflow.name,
                        file.display(),
                        workflow.trigger.kind(),
                        workflow.actions.len()
                    );
                    match &workflow.trigger {
                        Trigger::Cron { schedule } => {
                            info!("[dry run]    schedule: {schedule}");
                        }
                        Trigger::FileWatch { path, events } => {
                            info!("[dry run]    watch: {} events: {:?}", path.display(), events);
                        }
                    }
                }
                Err(error) => {
                    error!(file = %file.display(), %error, "[dry run] would fail to load");
                }
            }
        }
    }
}

/// Non-recursive `*.yaml` / `*.yml` listing, sorted for deterministic starts.
fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let entries = std::fs::read_dir(dir).map_err(|source| EngineError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| EngineError::ReadDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_workflow_document(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_workflow_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
