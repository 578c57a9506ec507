//! Per-workflow execution log files.
//!
//! When the agent runs with `--log-dir`, every completed execution appends
//! one JSON line to `<log_dir>/<workflow_name>.log`. The shared tracing sink
//! keeps the full structured stream either way.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// One line in a per-workflow log file.
#[derive(Debug, Serialize)]
pub struct ExecutionLogLine<'a> {
    pub timestamp: DateTime<Utc>,
    pub workflow_name: &'a str,
    pub trigger_type: &'a str,
    pub status: &'a str,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Append-only sink rooted at the configured log directory.
#[derive(Debug, Clone)]
pub struct ExecutionLogDir {
    dir: PathBuf,
}

impl ExecutionLogDir {
    /// Create the directory if needed and return the sink.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Append one execution outcome. Failures degrade observability only,
    /// so they are logged and swallowed.
    pub fn append(&self, line: &ExecutionLogLine<'_>) {
        let path = self.dir.join(format!("{}.log", line.workflow_name));
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| {
                let mut encoded = serde_json::to_vec(line).unwrap_or_default();
                encoded.push(b'\n');
                file.write_all(&encoded)
            });

        if let Err(error) = result {
            warn!(
                workflow_name = %line.workflow_name,
                path = %path.display(),
                %error,
                "failed to append workflow execution log"
            );
        }
    }
}
