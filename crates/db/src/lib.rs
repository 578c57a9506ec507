//! `db` crate — the durable execution history store.
//!
//! SQLite behind an sqlx pool: typed row structs and repository functions
//! for the two history tables. No business logic lives here; the engine is
//! the single writer per record, readers come from the CLI and the HTTP
//! surface.

pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use pool::DbPool;
