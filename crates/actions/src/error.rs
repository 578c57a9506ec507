//! Action-level error type.
//!
//! The `Display` text of every variant is part of the contract: retry
//! predicates (`timeout`, `network`, `status:<N>`, substrings) match against
//! it, so the wording below is load-bearing.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a single action attempt.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action was handed fields that make it unexecutable.
    #[error("invalid argument for action '{action}': {message}")]
    InvalidArgument { action: String, message: String },

    /// The shell command exited non-zero.
    #[error("bash action '{action}' failed with exit code {code}")]
    CommandFailed { action: String, code: i32 },

    /// The shell command could not be spawned at all.
    #[error("bash action '{action}' failed to execute: {source}")]
    CommandSpawn {
        action: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request did not complete within its deadline.
    #[error("http action '{action}' timeout: deadline exceeded after {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    /// Connection, DNS, or transport failure.
    #[error("http action '{action}' network error: {source}")]
    Network {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response arrived with a status outside `expect_status`.
    #[error("http action '{action}' failed: unexpected status code {status}, expected one of {expected:?}")]
    UnexpectedStatus {
        action: String,
        status: u16,
        expected: Vec<u16>,
    },

    /// The response body is missing the configured substring.
    #[error("http action '{action}' failed: response body does not contain expected string '{needle}'")]
    BodyMismatch { action: String, needle: String },

    /// The enclosing workflow was cancelled while the action was in flight
    /// or waiting out a retry backoff. Never retried, never alert-counted.
    #[error("action '{action}' cancelled")]
    Cancelled { action: String },
}

impl ActionError {
    /// True when the failure is a cancellation outcome rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActionError::Cancelled { .. })
    }
}
