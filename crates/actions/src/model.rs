//! The action data model.
//!
//! Actions are a tagged variant: the YAML `type` field selects the shape and
//! serde enforces it. Fields that only make sense on another variant are
//! caught by the document parser's field audit before deserialisation, so
//! the types here can stay strict.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::retry::RetryConfig;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One unit of work within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Bash(BashAction),
    Http(HttpAction),
    Custom(CustomAction),
}

impl Action {
    /// The user-facing action name, common to every variant.
    pub fn name(&self) -> &str {
        match self {
            Action::Bash(a) => &a.name,
            Action::Http(a) => &a.name,
            Action::Custom(a) => &a.name,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Bash(_) => ActionKind::Bash,
            Action::Http(_) => ActionKind::Http,
            Action::Custom(_) => ActionKind::Custom,
        }
    }

    pub fn retry(&self) -> Option<&RetryConfig> {
        match self {
            Action::Bash(a) => a.retry.as_ref(),
            Action::Http(a) => a.retry.as_ref(),
            Action::Custom(a) => a.retry.as_ref(),
        }
    }
}

/// Discriminator for metrics labels and history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Bash,
    Http,
    Custom,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Bash => write!(f, "bash"),
            ActionKind::Http => write!(f, "http"),
            ActionKind::Custom => write!(f, "custom"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bash
// ---------------------------------------------------------------------------

/// Runs a command through `sh -c`, capturing stdout and stderr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BashAction {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Sends one HTTP request and validates the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpAction {
    pub name: String,
    pub url: String,
    pub method: String,
    /// Applied verbatim; stored case-sensitively, matched per HTTP rules.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Human-readable duration, e.g. `10s`. Bounded default applies when absent.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<ExpectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_body_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

// ---------------------------------------------------------------------------
// Custom (reserved)
// ---------------------------------------------------------------------------

/// Reserved for user-defined functions. Execution is unimplemented: the
/// executor reports it as skipped rather than claiming success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAction {
    pub name: String,
    pub function_name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub arguments: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

// ---------------------------------------------------------------------------
// ExpectStatus
// ---------------------------------------------------------------------------

/// Accepted response status codes: a single value or a list.
///
/// YAML frequently hands numeric scalars over as floats; integral floats are
/// coerced, anything fractional or out of range is a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExpectStatus {
    Single(u16),
    AnyOf(Vec<u16>),
}

impl ExpectStatus {
    /// Whether `status` satisfies this expectation.
    pub fn matches(&self, status: u16) -> bool {
        match self {
            ExpectStatus::Single(code) => *code == status,
            ExpectStatus::AnyOf(codes) => codes.contains(&status),
        }
    }

    /// The full accepted set, for error messages.
    pub fn accepted(&self) -> Vec<u16> {
        match self {
            ExpectStatus::Single(code) => vec![*code],
            ExpectStatus::AnyOf(codes) => codes.clone(),
        }
    }
}

fn coerce_status<E: de::Error>(value: f64) -> Result<u16, E> {
    if value.fract() != 0.0 || !(0.0..=u16::MAX as f64).contains(&value) {
        return Err(E::custom(format!(
            "expect_status entries must be integer status codes, got {value}"
        )));
    }
    Ok(value as u16)
}

struct ExpectStatusVisitor;

impl<'de> Visitor<'de> for ExpectStatusVisitor {
    type Value = ExpectStatus;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer status code or a list of integer status codes")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        coerce_status(v as f64).map(ExpectStatus::Single)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        coerce_status(v as f64).map(ExpectStatus::Single)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        coerce_status(v).map(ExpectStatus::Single)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut codes = Vec::new();
        while let Some(entry) = seq.next_element::<StatusEntry>()? {
            codes.push(entry.0);
        }
        Ok(ExpectStatus::AnyOf(codes))
    }
}

/// One list element, with the same numeric coercion as the scalar form.
struct StatusEntry(u16);

impl<'de> Deserialize<'de> for StatusEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = StatusEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer status code")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                coerce_status(v as f64).map(StatusEntry)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                coerce_status(v as f64).map(StatusEntry)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                coerce_status(v).map(StatusEntry)
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}

impl<'de> Deserialize<'de> for ExpectStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExpectStatusVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_status_single_integer() {
        let status: ExpectStatus = serde_yaml::from_str("200").unwrap();
        assert_eq!(status, ExpectStatus::Single(200));
        assert!(status.matches(200));
        assert!(!status.matches(201));
    }

    #[test]
    fn expect_status_list() {
        let status: ExpectStatus = serde_yaml::from_str("[200, 201, 204]").unwrap();
        assert!(status.matches(204));
        assert!(!status.matches(500));
        assert_eq!(status.accepted(), vec![200, 201, 204]);
    }

    #[test]
    fn expect_status_coerces_integral_floats() {
        let status: ExpectStatus = serde_yaml::from_str("200.0").unwrap();
        assert_eq!(status, ExpectStatus::Single(200));

        let status: ExpectStatus = serde_yaml::from_str("[200.0, 301]").unwrap();
        assert!(status.matches(301));
    }

    #[test]
    fn expect_status_rejects_fractional_values() {
        assert!(serde_yaml::from_str::<ExpectStatus>("200.5").is_err());
        assert!(serde_yaml::from_str::<ExpectStatus>("[200, 201.7]").is_err());
    }

    #[test]
    fn expect_status_rejects_strings() {
        assert!(serde_yaml::from_str::<ExpectStatus>("\"ok\"").is_err());
    }

    #[test]
    fn action_deserialises_by_tag() {
        let yaml = r#"
type: bash
name: cleanup
command: "rm -rf /tmp/scratch"
"#;
        let action: Action = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(action.name(), "cleanup");
        assert_eq!(action.kind(), ActionKind::Bash);
        assert!(action.retry().is_none());
    }

    #[test]
    fn http_action_parses_timeout_and_headers() {
        let yaml = r#"
type: http
name: ping
url: "https://example.com/health"
method: GET
timeout: 10s
headers:
  Accept: application/json
expect_status: [200, 204]
"#;
        let action: Action = serde_yaml::from_str(yaml).unwrap();
        let Action::Http(http) = action else {
            panic!("expected http variant");
        };
        assert_eq!(http.timeout, Some(Duration::from_secs(10)));
        assert_eq!(http.headers["Accept"], "application/json");
        assert!(http.expect_status.unwrap().matches(204));
    }
}
