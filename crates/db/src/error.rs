//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    /// Completing a record that is not `running`: a programming error on the
    /// caller's side, surfaced so it can be logged rather than hidden.
    #[error("execution record {id} is not running, refusing to complete it twice")]
    AlreadyCompleted { id: i64 },
}
