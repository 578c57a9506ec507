//! Shared runtime wiring handed to every per-workflow task.

use std::sync::Arc;

use actions::ActionExecutor;
use db::DbPool;

use crate::execlog::ExecutionLogDir;
use crate::registry::WorkflowRegistry;

/// Everything the triggers and the pipeline need: the history store, the
/// action executor, the registry, and the optional per-workflow log sink.
/// Constructed once before the first task starts and torn down after drain.
#[derive(Debug, Clone)]
pub struct WorkflowRuntime {
    pub pool: DbPool,
    pub executor: ActionExecutor,
    pub registry: Arc<WorkflowRegistry>,
    pub execution_log: Option<ExecutionLogDir>,
}

impl WorkflowRuntime {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            executor: ActionExecutor::new(),
            registry: Arc::new(WorkflowRegistry::new()),
            execution_log: None,
        }
    }

    pub fn with_execution_log(mut self, log: ExecutionLogDir) -> Self {
        self.execution_log = Some(log);
        self
    }
}
