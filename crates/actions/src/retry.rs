//! Retry policy: decide whether and when to re-run a failing action.
//!
//! Backoff is exponential (`initial_delay * multiplier^(k-1)`, capped at
//! `max_delay`) with ±10 % jitter, floored at `initial_delay`. All sleeps
//! observe the workflow's cancellation token. The jitter source is
//! injectable so tests stay deterministic.

use std::future::Future;
use std::time::Duration;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ActionError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-action retry configuration, parsed from the workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first; `0` or `1` disables retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Empty means retry on any failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry_on: Vec<RetryPredicate>,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            retry_on: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// The stock policy biased toward transient HTTP failures.
    pub fn default_policy() -> Self {
        Self {
            max_attempts: 3,
            retry_on: vec![
                RetryPredicate::Timeout,
                RetryPredicate::Network,
                RetryPredicate::Status(500),
                RetryPredicate::Status(502),
                RetryPredicate::Status(503),
                RetryPredicate::Status(504),
            ],
            ..Self::default()
        }
    }
}

/// Status codes worth retrying when no explicit `retry_on` is configured
/// by a caller that wants the stock bias.
pub fn is_retryable_http_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One `retry_on` entry. Matching is a case-insensitive check against the
/// failure's error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPredicate {
    /// Matches "timeout" or "deadline exceeded".
    Timeout,
    /// Matches "network", "connection", or "dns".
    Network,
    /// Matches any failure.
    Any,
    /// Matches "status code <N>" or "status <N>".
    Status(u16),
    /// Matches the literal substring.
    Substring(String),
}

impl RetryPredicate {
    fn parse(raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        match lowered.as_str() {
            "timeout" => RetryPredicate::Timeout,
            "network" => RetryPredicate::Network,
            "error" => RetryPredicate::Any,
            _ => {
                if let Some(code) = lowered.strip_prefix("status:") {
                    if let Ok(code) = code.trim().parse::<u16>() {
                        return RetryPredicate::Status(code);
                    }
                }
                RetryPredicate::Substring(lowered)
            }
        }
    }

    fn matches(&self, error_text: &str) -> bool {
        match self {
            RetryPredicate::Timeout => {
                error_text.contains("timeout") || error_text.contains("deadline exceeded")
            }
            RetryPredicate::Network => {
                error_text.contains("network")
                    || error_text.contains("connection")
                    || error_text.contains("dns")
            }
            RetryPredicate::Any => true,
            RetryPredicate::Status(code) => {
                error_text.contains(&format!("status code {code}"))
                    || error_text.contains(&format!("status {code}"))
            }
            RetryPredicate::Substring(needle) => error_text.contains(needle.as_str()),
        }
    }
}

impl std::fmt::Display for RetryPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryPredicate::Timeout => write!(f, "timeout"),
            RetryPredicate::Network => write!(f, "network"),
            RetryPredicate::Any => write!(f, "error"),
            RetryPredicate::Status(code) => write!(f, "status:{code}"),
            RetryPredicate::Substring(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for RetryPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RetryPredicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(de::Error::custom("retry_on entries must be non-empty"));
        }
        Ok(RetryPredicate::parse(&raw))
    }
}

/// Whether `error` should be retried under the configured predicates.
/// An empty predicate list retries on any failure; cancellation never retries.
pub fn should_retry(error: &ActionError, predicates: &[RetryPredicate]) -> bool {
    if error.is_cancellation() {
        return false;
    }
    if predicates.is_empty() {
        return true;
    }
    let text = error.to_string().to_ascii_lowercase();
    predicates.iter().any(|p| p.matches(&text))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run `attempt` under `config`, sleeping between failures.
///
/// Uses thread-local randomness for jitter; tests that need determinism go
/// through [`run_with_retry_jittered`].
pub async fn run_with_retry<T, F, Fut>(
    action_name: &str,
    config: Option<&RetryConfig>,
    cancel: &CancellationToken,
    attempt: F,
) -> Result<T, ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    run_with_retry_jittered(action_name, config, cancel, &unit_jitter, attempt).await
}

fn unit_jitter() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen_range(-1.0..=1.0)
}

/// As [`run_with_retry`], with an injected jitter sampler returning values
/// in `[-1, 1]`.
pub async fn run_with_retry_jittered<T, F, Fut>(
    action_name: &str,
    config: Option<&RetryConfig>,
    cancel: &CancellationToken,
    jitter: &(dyn Fn() -> f64 + Sync),
    mut attempt: F,
) -> Result<T, ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    let max_attempts = config.map(|c| c.max_attempts).unwrap_or(1).max(1);
    let config = config.cloned().unwrap_or_default();

    let mut last_error = None;
    for attempt_no in 1..=max_attempts {
        match attempt().await {
            Ok(value) => {
                if attempt_no > 1 {
                    info!(
                        action_name,
                        attempt = attempt_no,
                        max_attempts,
                        "action succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                if err.is_cancellation() {
                    return Err(err);
                }

                if attempt_no >= max_attempts {
                    error!(
                        action_name,
                        max_attempts,
                        error = %err,
                        "action failed after all retry attempts"
                    );
                    last_error = Some(err);
                    break;
                }

                if !should_retry(&err, &config.retry_on) {
                    warn!(
                        action_name,
                        attempt = attempt_no,
                        error = %err,
                        "action failed with non-retryable error"
                    );
                    return Err(err);
                }

                let delay = backoff_delay(&config, attempt_no - 1, jitter());
                info!(
                    action_name,
                    attempt = attempt_no,
                    max_attempts,
                    next_retry_in = %humantime::format_duration(delay),
                    error = %err,
                    "action failed, retrying"
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(ActionError::Cancelled {
                            action: action_name.to_string(),
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    // max_attempts >= 1, so at least one attempt ran and stored its error.
    Err(last_error.unwrap_or(ActionError::Cancelled {
        action: action_name.to_string(),
    }))
}

/// Delay before retry number `attempt + 1`, `attempt` 0-indexed.
fn backoff_delay(config: &RetryConfig, attempt: u32, jitter_unit: f64) -> Duration {
    let initial = config.initial_delay.as_secs_f64();
    let multiplier = config.multiplier.max(1.0);
    let base = (initial * multiplier.powi(attempt as i32)).min(config.max_delay.as_secs_f64());
    let jittered = base + base * 0.1 * jitter_unit.clamp(-1.0, 1.0);
    Duration::from_secs_f64(jittered.max(initial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fail(msg: &str) -> ActionError {
        ActionError::InvalidArgument {
            action: "t".into(),
            message: msg.into(),
        }
    }

    #[test]
    fn predicate_parsing() {
        assert_eq!(RetryPredicate::parse("timeout"), RetryPredicate::Timeout);
        assert_eq!(RetryPredicate::parse("Network"), RetryPredicate::Network);
        assert_eq!(RetryPredicate::parse("error"), RetryPredicate::Any);
        assert_eq!(RetryPredicate::parse("status:503"), RetryPredicate::Status(503));
        assert_eq!(
            RetryPredicate::parse("status:abc"),
            RetryPredicate::Substring("status:abc".into())
        );
        assert_eq!(
            RetryPredicate::parse("ECONNREFUSED"),
            RetryPredicate::Substring("econnrefused".into())
        );
    }

    #[test]
    fn predicate_matching_against_error_text() {
        let timeout = ActionError::Timeout {
            action: "ping".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(should_retry(&timeout, &[RetryPredicate::Timeout]));
        assert!(!should_retry(&timeout, &[RetryPredicate::Network]));

        let status = ActionError::UnexpectedStatus {
            action: "ping".into(),
            status: 503,
            expected: vec![200],
        };
        assert!(should_retry(&status, &[RetryPredicate::Status(503)]));
        assert!(!should_retry(&status, &[RetryPredicate::Status(500)]));

        let exit = ActionError::CommandFailed {
            action: "job".into(),
            code: 2,
        };
        assert!(should_retry(&exit, &[RetryPredicate::Substring("exit code 2".into())]));
        assert!(should_retry(&exit, &[RetryPredicate::Any]));
        // Empty predicate list retries everything.
        assert!(should_retry(&exit, &[]));
    }

    #[test]
    fn cancellation_is_never_retryable() {
        let cancelled = ActionError::Cancelled { action: "x".into() };
        assert!(!should_retry(&cancelled, &[]));
        assert!(!should_retry(&cancelled, &[RetryPredicate::Any]));
    }

    #[test]
    fn backoff_delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
            retry_on: vec![],
        };
        assert_eq!(backoff_delay(&config, 0, 0.0), Duration::from_millis(100));
        assert_eq!(backoff_delay(&config, 1, 0.0), Duration::from_millis(200));
        // 400ms capped to 350ms.
        assert_eq!(backoff_delay(&config, 2, 0.0), Duration::from_millis(350));
        // Negative jitter never drops below initial_delay.
        assert_eq!(backoff_delay(&config, 0, -1.0), Duration::from_millis(100));
        // Positive jitter adds at most 10 %.
        assert_eq!(backoff_delay(&config, 1, 1.0), Duration::from_millis(220));
    }

    #[tokio::test]
    async fn single_attempt_when_retry_disabled() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), _> = run_with_retry("once", None, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(fail("boom")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_with_expected_spacing() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            retry_on: vec![],
        };

        let started = tokio::time::Instant::now();
        let result = run_with_retry_jittered("flaky", Some(&config), &cancel, &|| 0.0, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(fail("transient"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff between the three attempts.
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn non_retryable_failure_returns_immediately() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let config = RetryConfig {
            max_attempts: 3,
            retry_on: vec![RetryPredicate::Timeout],
            ..RetryConfig::default()
        };

        let result: Result<(), _> = run_with_retry("strict", Some(&config), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ActionError::CommandFailed {
                    action: "strict".into(),
                    code: 2,
                })
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("exit code 2"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_aborts_with_cancelled() {
        let cancel = CancellationToken::new();
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_secs(30),
            ..RetryConfig::default()
        };

        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            child.cancel();
        });

        let result: Result<(), _> = run_with_retry("doomed", Some(&config), &cancel, || async {
            Err(fail("always"))
        })
        .await;

        assert!(matches!(result, Err(ActionError::Cancelled { .. })));
    }
}
