//! Repository functions, one per history-store operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`;
//! the engine decides what to record and when, this layer only speaks SQL.

pub mod actions;
pub mod executions;
