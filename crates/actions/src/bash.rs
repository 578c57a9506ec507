//! Shell command executor.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ActionError;
use crate::model::BashAction;

/// Captured output is clipped before it reaches logs or the history store.
pub const MAX_CAPTURED_OUTPUT: usize = 4096;

/// Run the command once through `sh -c`, capturing stdout and stderr.
///
/// Succeeds iff the exit status is zero; the failure text carries the action
/// name and exit code so retry predicates can match on them.
pub async fn execute_once(
    action: &BashAction,
    cancel: &CancellationToken,
) -> Result<String, ActionError> {
    if action.command.trim().is_empty() {
        return Err(ActionError::InvalidArgument {
            action: action.name.clone(),
            message: "bash action command cannot be empty".into(),
        });
    }

    info!(
        action_name = %action.name,
        command = %action.command,
        "executing bash action"
    );

    let mut command = tokio::process::Command::new("sh");
    command.arg("-c").arg(&action.command).kill_on_drop(true);

    let output = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(ActionError::Cancelled {
                action: action.name.clone(),
            });
        }
        output = command.output() => output.map_err(|source| ActionError::CommandSpawn {
            action: action.name.clone(),
            source,
        })?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let captured = clip_output(&stdout, &stderr);

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        error!(
            action_name = %action.name,
            command = %action.command,
            exit_code = code,
            stdout = %stdout,
            stderr = %stderr,
            "bash action failed"
        );
        return Err(ActionError::CommandFailed {
            action: action.name.clone(),
            code,
        });
    }

    info!(
        action_name = %action.name,
        command = %action.command,
        stdout = %stdout,
        stderr = %stderr,
        "bash action completed successfully"
    );

    Ok(captured)
}

/// Merge stdout and stderr into one stored blob, truncated to
/// [`MAX_CAPTURED_OUTPUT`] on a char boundary.
fn clip_output(stdout: &str, stderr: &str) -> String {
    let mut combined = String::with_capacity(stdout.len() + stderr.len());
    combined.push_str(stdout);
    if !stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(stderr);
    }

    if combined.len() > MAX_CAPTURED_OUTPUT {
        let mut end = MAX_CAPTURED_OUTPUT;
        while !combined.is_char_boundary(end) {
            end -= 1;
        }
        combined.truncate(end);
    }
    combined
}
