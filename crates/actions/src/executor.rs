//! Dispatch an [`Action`] to its executor under the action's retry policy.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ActionError;
use crate::model::Action;
use crate::{bash, http, retry};

/// What a completed action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran and succeeded; `output` is the clipped capture.
    Completed { output: Option<String> },
    /// Reserved action kinds are declined, never silently succeeded.
    Skipped,
}

impl ActionOutcome {
    pub fn output(&self) -> Option<&str> {
        match self {
            ActionOutcome::Completed { output } => output.as_deref(),
            ActionOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ActionOutcome::Skipped)
    }
}

/// Runs single actions. One executor is shared across all workflows so the
/// HTTP connection pool is reused.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    client: reqwest::Client,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `action` to a terminal outcome, retrying per its policy.
    ///
    /// Total elapsed time (including backoff) is the caller's to measure;
    /// this function only guarantees that every attempt and every backoff
    /// sleep observes `cancel`.
    pub async fn execute(
        &self,
        action: &Action,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, ActionError> {
        match action {
            Action::Bash(bash_action) => {
                let output = retry::run_with_retry(&bash_action.name, action.retry(), cancel, || {
                    bash::execute_once(bash_action, cancel)
                })
                .await?;
                Ok(ActionOutcome::Completed {
                    output: Some(output),
                })
            }
            Action::Http(http_action) => {
                let output = retry::run_with_retry(&http_action.name, action.retry(), cancel, || {
                    http::execute_once(&self.client, http_action, cancel)
                })
                .await?;
                Ok(ActionOutcome::Completed {
                    output: Some(output),
                })
            }
            Action::Custom(custom) => {
                info!(
                    action_name = %custom.name,
                    function_name = %custom.function_name,
                    "custom action execution is not implemented, skipping"
                );
                Ok(ActionOutcome::Skipped)
            }
        }
    }
}
