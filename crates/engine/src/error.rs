//! Engine-level error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the workflow engine (parsing, validation, triggers,
/// supervision).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Document errors ------

    #[error("workflow file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read workflow file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not parseable YAML or has the wrong shape.
    #[error("failed to parse workflow document: {0}")]
    InvalidDocument(#[from] serde_yaml::Error),

    /// The document parsed but violates a semantic rule.
    #[error("workflow validation failed: {0}")]
    Validation(String),

    // ------ Runtime errors ------

    /// A trigger could not be set up; the workflow is not started and other
    /// workflows are unaffected.
    #[error("trigger setup failed for workflow '{workflow}': {message}")]
    TriggerSetup { workflow: String, message: String },

    /// Enumerating the workflow directory failed.
    #[error("failed to read workflow directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
