//! HTTP request executor.

use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ActionError;
use crate::model::HttpAction;

/// Applied when the action carries no `timeout`; no request waits unbounded.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response bodies are clipped to this many chars in logs and history.
pub const BODY_OVERVIEW_CHARS: usize = 200;

/// Send the request once and validate the response.
///
/// Validation order: status first, then body substring. Every failure text is
/// classifiable by the retry predicates (`timeout`, `network`, `status:<N>`).
pub async fn execute_once(
    client: &reqwest::Client,
    action: &HttpAction,
    cancel: &CancellationToken,
) -> Result<String, ActionError> {
    if action.url.trim().is_empty() {
        return Err(ActionError::InvalidArgument {
            action: action.name.clone(),
            message: "http action has empty url".into(),
        });
    }
    let method = Method::from_bytes(action.method.as_bytes()).map_err(|_| {
        ActionError::InvalidArgument {
            action: action.name.clone(),
            message: format!("invalid http method '{}'", action.method),
        }
    })?;

    info!(
        action_name = %action.name,
        method = %method,
        url = %action.url,
        "executing http action"
    );

    let timeout = action.timeout.unwrap_or(DEFAULT_TIMEOUT);
    let mut request = client
        .request(method.clone(), &action.url)
        .timeout(timeout);
    for (key, value) in &action.headers {
        request = request.header(key, value);
    }
    if let Some(body) = &action.body {
        request = request.body(body.clone());
    }

    let response = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(ActionError::Cancelled {
                action: action.name.clone(),
            });
        }
        response = request.send() => response.map_err(|source| classify(action, timeout, source))?,
    };

    let status = response.status().as_u16();

    let body = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(ActionError::Cancelled {
                action: action.name.clone(),
            });
        }
        body = response.text() => body.map_err(|source| classify(action, timeout, source))?,
    };

    let overview: String = body.chars().take(BODY_OVERVIEW_CHARS).collect();
    info!(
        action_name = %action.name,
        method = %method,
        url = %action.url,
        status_code = status,
        response_body_overview = %overview,
        "http action response received"
    );

    if let Some(expect) = &action.expect_status {
        if !expect.matches(status) {
            let err = ActionError::UnexpectedStatus {
                action: action.name.clone(),
                status,
                expected: expect.accepted(),
            };
            error!(action_name = %action.name, status_code = status, error = %err, "unexpected status code");
            return Err(err);
        }
    }

    if let Some(needle) = &action.expect_body_contains {
        if !body.contains(needle.as_str()) {
            let err = ActionError::BodyMismatch {
                action: action.name.clone(),
                needle: needle.clone(),
            };
            error!(action_name = %action.name, error = %err, "response body validation failed");
            return Err(err);
        }
    }

    info!(action_name = %action.name, status_code = status, "http action completed successfully");
    Ok(overview)
}

/// Map a transport failure onto the retry-classifiable taxonomy.
fn classify(action: &HttpAction, timeout: Duration, source: reqwest::Error) -> ActionError {
    if source.is_timeout() {
        ActionError::Timeout {
            action: action.name.clone(),
            timeout,
        }
    } else {
        ActionError::Network {
            action: action.name.clone(),
            source,
        }
    }
}
