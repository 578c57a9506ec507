//! In-memory registry of live workflows, projected read-only by the HTTP
//! surface. Mutated by per-workflow tasks on registration, execution, and
//! stop; readers take a snapshot and never hold the lock across await.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::Workflow;

/// Live status of a registered workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Active,
    Stopped,
    Error,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Active => write!(f, "active"),
            WorkflowStatus::Stopped => write!(f, "stopped"),
            WorkflowStatus::Error => write!(f, "error"),
        }
    }
}

/// Derived action summary for the projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowActionInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: String,
}

/// Runtime information about one workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeWorkflowInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub status: WorkflowStatus,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_execution: Option<DateTime<Utc>>,
    pub total_runs: u64,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub actions: Vec<WorkflowActionInfo>,
}

/// Thread-safe name → info mapping.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, RuntimeWorkflowInfo>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a workflow as active.
    pub fn register(&self, workflow: &Workflow) {
        let actions = workflow
            .actions
            .iter()
            .map(|a| WorkflowActionInfo {
                name: a.name().to_string(),
                action_type: a.kind().to_string(),
            })
            .collect();

        let info = RuntimeWorkflowInfo {
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            trigger_type: workflow.trigger.kind().to_string(),
            schedule: workflow.trigger.schedule().map(str::to_string),
            status: WorkflowStatus::Active,
            registered_at: Utc::now(),
            last_execution: None,
            next_execution: None,
            total_runs: 0,
            success_count: 0,
            failure_count: 0,
            last_error: None,
            actions,
        };

        self.workflows.write().insert(workflow.name.clone(), info);
    }

    /// Mark a workflow stopped; the entry stays visible for the projection.
    pub fn mark_stopped(&self, name: &str) {
        if let Some(info) = self.workflows.write().get_mut(name) {
            info.status = WorkflowStatus::Stopped;
        }
    }

    /// Mark a workflow as failed to run, with its setup error.
    pub fn mark_error(&self, name: &str, error: &str) {
        if let Some(info) = self.workflows.write().get_mut(name) {
            info.status = WorkflowStatus::Error;
            info.last_error = Some(error.to_string());
        }
    }

    /// Remove a workflow entry entirely (document deleted).
    pub fn remove(&self, name: &str) {
        self.workflows.write().remove(name);
    }

    /// Fold one finished execution into the counters.
    pub fn update_execution_stats(&self, name: &str, success: bool, error: Option<&str>) {
        if let Some(info) = self.workflows.write().get_mut(name) {
            info.last_execution = Some(Utc::now());
            info.total_runs += 1;
            if success {
                info.success_count += 1;
                info.last_error = None;
            } else {
                info.failure_count += 1;
                if let Some(error) = error {
                    info.last_error = Some(error.to_string());
                }
            }
        }
    }

    pub fn update_next_execution(&self, name: &str, next: DateTime<Utc>) {
        if let Some(info) = self.workflows.write().get_mut(name) {
            info.next_execution = Some(next);
        }
    }

    pub fn get(&self, name: &str) -> Option<RuntimeWorkflowInfo> {
        self.workflows.read().get(name).cloned()
    }

    /// Snapshot of every registered workflow.
    pub fn all(&self) -> Vec<RuntimeWorkflowInfo> {
        self.workflows.read().values().cloned().collect()
    }

    /// Snapshot of the currently active workflows.
    pub fn active(&self) -> Vec<RuntimeWorkflowInfo> {
        self.workflows
            .read()
            .values()
            .filter(|info| info.status == WorkflowStatus::Active)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.workflows.read().len()
    }
}
