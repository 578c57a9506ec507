//! Workflow document parser and validator.
//!
//! Parsing is two passes. A field audit over the raw YAML first: fields that
//! belong to another trigger or action variant produce warnings (they will
//! be ignored), except that an HTTP action carrying shell or custom fields
//! is a hard error. Then the typed deserialisation and semantic validation.

use std::path::Path;

use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::models::{Trigger, Workflow};
use crate::trigger::cron::parse_cron;

/// A validated workflow plus the warnings the audit produced. Warnings are
/// logged by default; `validate --strict` promotes them to failures.
#[derive(Debug)]
pub struct ParsedWorkflow {
    pub workflow: Workflow,
    pub warnings: Vec<String>,
}

/// Read, parse, and validate one workflow document.
pub fn parse_workflow_file(path: impl AsRef<Path>) -> Result<ParsedWorkflow, EngineError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| EngineError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = parse_workflow_str(&text)?;
    info!(
        file = %path.display(),
        workflow_name = %parsed.workflow.name,
        "successfully parsed workflow file"
    );
    Ok(parsed)
}

/// Parse and validate a workflow document from its textual form.
pub fn parse_workflow_str(text: &str) -> Result<ParsedWorkflow, EngineError> {
    let raw: Value = serde_yaml::from_str(text)?;
    let warnings = audit_fields(&raw)?;

    let workflow: Workflow = serde_yaml::from_value(raw)?;
    validate_workflow(&workflow)?;

    for warning in &warnings {
        warn!("{warning}");
    }

    Ok(ParsedWorkflow { workflow, warnings })
}

// ---------------------------------------------------------------------------
// Field audit
// ---------------------------------------------------------------------------

const HTTP_FIELDS: &[&str] = &[
    "url",
    "method",
    "headers",
    "body",
    "timeout",
    "expect_status",
    "expect_body_contains",
];
const SHELL_FIELDS: &[&str] = &["command"];
const CUSTOM_FIELDS: &[&str] = &["function_name", "arguments"];

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn has_any(mapping: &serde_yaml::Mapping, fields: &[&str]) -> bool {
    fields.iter().any(|f| mapping.contains_key(&key(f)))
}

fn str_field(mapping: &serde_yaml::Mapping, field: &str) -> Option<String> {
    mapping
        .get(&key(field))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Collect tag-wrong-field warnings and enforce the one hard error.
fn audit_fields(raw: &Value) -> Result<Vec<String>, EngineError> {
    let mut warnings = Vec::new();
    let Some(doc) = raw.as_mapping() else {
        return Ok(warnings);
    };

    if let Some(trigger) = doc.get(&key("trigger")).and_then(|v| v.as_mapping()) {
        match str_field(trigger, "type").as_deref() {
            Some("cron") => {
                if has_any(trigger, &["path", "events"]) {
                    warnings.push(
                        "cron trigger has unexpected 'path' or 'events' fields; they will be ignored"
                            .to_string(),
                    );
                }
            }
            Some("filewatch") => {
                if has_any(trigger, &["schedule"]) {
                    warnings.push(
                        "filewatch trigger has unexpected 'schedule' field; it will be ignored"
                            .to_string(),
                    );
                }
            }
            _ => {}
        }
    }

    if let Some(actions) = doc.get(&key("actions")).and_then(|v| v.as_sequence()) {
        for (index, action) in actions.iter().enumerate() {
            let Some(action) = action.as_mapping() else {
                continue;
            };
            let name = str_field(action, "name").unwrap_or_else(|| format!("#{index}"));

            match str_field(action, "type").as_deref() {
                Some("bash") => {
                    if has_any(action, HTTP_FIELDS) || has_any(action, CUSTOM_FIELDS) {
                        warnings.push(format!(
                            "bash action '{name}' at index {index} has unexpected HTTP or custom fields; they will be ignored"
                        ));
                    }
                }
                Some("http") => {
                    if has_any(action, SHELL_FIELDS) || has_any(action, CUSTOM_FIELDS) {
                        return Err(EngineError::Validation(format!(
                            "HTTP action '{name}' at index {index} has unexpected bash or custom fields"
                        )));
                    }
                }
                Some("custom") => {
                    if has_any(action, SHELL_FIELDS) || has_any(action, HTTP_FIELDS) {
                        warnings.push(format!(
                            "custom action '{name}' at index {index} has unexpected bash or HTTP fields; they will be ignored"
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    Ok(warnings)
}

// ---------------------------------------------------------------------------
// Semantic validation
// ---------------------------------------------------------------------------

fn validate_workflow(workflow: &Workflow) -> Result<(), EngineError> {
    if workflow.name.trim().is_empty() {
        return Err(EngineError::Validation(
            "workflow name cannot be empty".into(),
        ));
    }

    if workflow.actions.is_empty() {
        return Err(EngineError::Validation(
            "workflow must define at least one action".into(),
        ));
    }

    match &workflow.trigger {
        Trigger::Cron { schedule } => {
            if schedule.trim().is_empty() {
                return Err(EngineError::Validation(
                    "cron trigger requires a 'schedule'".into(),
                ));
            }
            parse_cron(schedule).map_err(|e| {
                EngineError::Validation(format!("invalid cron expression '{schedule}': {e}"))
            })?;
        }
        Trigger::FileWatch { path, events } => {
            if path.as_os_str().is_empty() {
                return Err(EngineError::Validation(
                    "filewatch trigger requires a 'path'".into(),
                ));
            }
            if events.is_empty() {
                return Err(EngineError::Validation(
                    "filewatch trigger requires at least one 'event'".into(),
                ));
            }
        }
    }

    for (index, action) in workflow.actions.iter().enumerate() {
        if action.name().trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "action at index {index} must have a 'name'"
            )));
        }

        match action {
            actions::Action::Bash(bash) => {
                if bash.command.trim().is_empty() {
                    return Err(EngineError::Validation(format!(
                        "bash action '{}' at index {index} must have a 'command'",
                        bash.name
                    )));
                }
            }
            actions::Action::Http(http) => {
                if http.url.trim().is_empty() {
                    return Err(EngineError::Validation(format!(
                        "HTTP action '{}' at index {index} must have a 'url'",
                        http.name
                    )));
                }
                if http.method.trim().is_empty() {
                    return Err(EngineError::Validation(format!(
                        "HTTP action '{}' at index {index} must have a 'method'",
                        http.name
                    )));
                }
            }
            actions::Action::Custom(custom) => {
                if custom.function_name.trim().is_empty() {
                    return Err(EngineError::Validation(format!(
                        "custom action '{}' at index {index} must have a 'function_name'",
                        custom.name
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actions::{Action, ExpectStatus};
    use crate::models::WatchEvent;

    const CRON_DOC: &str = r#"
name: nightly-backup
description: Back up the data directory every night
trigger:
  type: cron
  schedule: "0 2 * * *"
actions:
  - type: bash
    name: archive
    command: "tar czf /backups/data.tgz /var/data"
  - type: http
    name: notify
    url: "https://hooks.example.com/done"
    method: POST
    expect_status: 200
"#;

    #[test]
    fn parses_a_valid_cron_workflow() {
        let parsed = parse_workflow_str(CRON_DOC).unwrap();
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.workflow.name, "nightly-backup");
        assert_eq!(parsed.workflow.trigger.schedule(), Some("0 2 * * *"));
        assert_eq!(parsed.workflow.actions.len(), 2);
        match &parsed.workflow.actions[1] {
            Action::Http(http) => {
                assert_eq!(http.expect_status, Some(ExpectStatus::Single(200)));
            }
            other => panic!("expected http action, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_filewatch_workflow() {
        let doc = r#"
name: on-upload
trigger:
  type: filewatch
  path: /var/incoming
  events: [create, write]
actions:
  - type: bash
    name: ingest
    command: "./ingest.sh"
"#;
        let parsed = parse_workflow_str(doc).unwrap();
        let Trigger::FileWatch { events, .. } = &parsed.workflow.trigger else {
            panic!("expected filewatch trigger");
        };
        assert_eq!(events, &[WatchEvent::Create, WatchEvent::Write]);
    }

    #[test]
    fn empty_name_is_rejected() {
        let doc = CRON_DOC.replace("name: nightly-backup", "name: \"\"");
        let err = parse_workflow_str(&doc).unwrap_err();
        assert!(err.to_string().contains("name cannot be empty"));
    }

    #[test]
    fn missing_actions_are_rejected() {
        let doc = r#"
name: empty
trigger:
  type: cron
  schedule: "* * * * *"
actions: []
"#;
        let err = parse_workflow_str(doc).unwrap_err();
        assert!(err.to_string().contains("at least one action"));
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        let doc = CRON_DOC.replace("0 2 * * *", "not a schedule");
        let err = parse_workflow_str(&doc).unwrap_err();
        assert!(err.to_string().contains("invalid cron expression"));
    }

    #[test]
    fn unknown_watch_event_is_rejected() {
        let doc = r#"
name: bad-events
trigger:
  type: filewatch
  path: /tmp
  events: [create, truncate]
actions:
  - type: bash
    name: x
    command: "true"
"#;
        assert!(parse_workflow_str(doc).is_err());
    }

    #[test]
    fn unknown_trigger_type_is_rejected() {
        let doc = CRON_DOC.replace("type: cron", "type: webhook");
        assert!(parse_workflow_str(&doc).is_err());
    }

    #[test]
    fn cron_trigger_with_filewatch_fields_warns() {
        let doc = r#"
name: mixed
trigger:
  type: cron
  schedule: "* * * * *"
  path: /tmp
actions:
  - type: bash
    name: x
    command: "true"
"#;
        let parsed = parse_workflow_str(doc).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("cron trigger"));
    }

    #[test]
    fn bash_action_with_http_fields_warns_but_parses() {
        let doc = r#"
name: mixed-action
trigger:
  type: cron
  schedule: "* * * * *"
actions:
  - type: bash
    name: x
    command: "true"
    url: "https://example.com"
"#;
        let parsed = parse_workflow_str(doc).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("bash action 'x'"));
    }

    #[test]
    fn http_action_with_shell_fields_is_a_hard_error() {
        let doc = r#"
name: bad-http
trigger:
  type: cron
  schedule: "* * * * *"
actions:
  - type: http
    name: call
    url: "https://example.com"
    method: GET
    command: "rm -rf /"
"#;
        let err = parse_workflow_str(doc).unwrap_err();
        assert!(err.to_string().contains("HTTP action 'call'"));
    }

    #[test]
    fn missing_required_http_fields_are_rejected() {
        let doc = r#"
name: no-method
trigger:
  type: cron
  schedule: "* * * * *"
actions:
  - type: http
    name: call
    url: "https://example.com"
"#;
        assert!(parse_workflow_str(doc).is_err());
    }

    #[test]
    fn retry_block_round_trips() {
        let doc = r#"
name: retried
trigger:
  type: cron
  schedule: "* * * * *"
actions:
  - type: bash
    name: flaky
    command: "./flaky.sh"
    retry:
      max_attempts: 3
      initial_delay: 500ms
      max_delay: 10s
      multiplier: 2
      retry_on: ["timeout", "status:503"]
"#;
        let parsed = parse_workflow_str(doc).unwrap();
        let retry = parsed.workflow.actions[0].retry().unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, std::time::Duration::from_millis(500));
        assert_eq!(retry.retry_on.len(), 2);
    }

    #[test]
    fn parse_serialise_parse_is_a_fixed_point() {
        let first = parse_workflow_str(CRON_DOC).unwrap().workflow;
        let serialised = serde_yaml::to_string(&first).unwrap();
        let second = parse_workflow_str(&serialised).unwrap().workflow;
        let reserialised = serde_yaml::to_string(&second).unwrap();
        assert_eq!(serialised, reserialised);
    }
}
