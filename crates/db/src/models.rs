//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` and `actions` crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of an execution row. `Running` becomes `Success` or `Failed`
/// exactly once; rows orphaned by a crash stay `Running` forever and are an
/// operator-visible signal, not something the store reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
    /// Reserved actions decline to run; only action rows carry this.
    Skipped,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// workflow_executions
// ---------------------------------------------------------------------------

/// One workflow firing, from trigger to terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRow {
    pub id: i64,
    pub workflow_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub trigger_type: String,
}

// ---------------------------------------------------------------------------
// action_executions
// ---------------------------------------------------------------------------

/// One action attempt chain within a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionExecutionRow {
    pub id: i64,
    pub workflow_execution_id: i64,
    pub action_name: String,
    pub action_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub output: Option<String>,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Success-rate statistics over a window of terminal rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub workflow_name: String,
    pub total_executions: i64,
    pub success_count: i64,
    pub failed_count: i64,
    /// Percentage in `[0, 100]`.
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}
