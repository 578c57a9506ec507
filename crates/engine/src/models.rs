//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory: the deserialised, validated configuration for one automation.
//! A `Workflow` is immutable for the life of its per-workflow task.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use actions::Action;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// The event source that decides when a workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    /// Fires on a cron schedule. Standard five-field expressions are
    /// accepted; a seconds-extended sixth field is tolerated.
    Cron { schedule: String },
    /// Fires on filesystem events against `path`.
    #[serde(rename = "filewatch")]
    FileWatch {
        path: PathBuf,
        /// Non-empty subset of the supported event kinds.
        events: Vec<WatchEvent>,
    },
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Cron { .. } => TriggerKind::Cron,
            Trigger::FileWatch { .. } => TriggerKind::FileWatch,
        }
    }

    /// The cron schedule, when this is a cron trigger.
    pub fn schedule(&self) -> Option<&str> {
        match self {
            Trigger::Cron { schedule } => Some(schedule),
            Trigger::FileWatch { .. } => None,
        }
    }
}

/// Discriminator for metrics labels, history rows, and projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Cron,
    #[serde(rename = "filewatch")]
    FileWatch,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Cron => write!(f, "cron"),
            TriggerKind::FileWatch => write!(f, "filewatch"),
        }
    }
}

/// Filesystem operations a filewatch trigger can react to. The parser
/// rejects anything else at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEvent {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEvent::Create => write!(f, "create"),
            WatchEvent::Write => write!(f, "write"),
            WatchEvent::Remove => write!(f, "remove"),
            WatchEvent::Rename => write!(f, "rename"),
            WatchEvent::Chmod => write!(f, "chmod"),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named automation binding one trigger to an ordered list of actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
}
