//! `actions` crate — the action data model and the built-in executors.
//!
//! An [`Action`] is one unit of work inside a workflow: a shell command, an
//! HTTP call, or a reserved custom function. The [`ActionExecutor`] runs a
//! single action under its retry policy and classifies the outcome; it knows
//! nothing about triggers, history, or metrics — those belong to the engine.

pub mod bash;
pub mod error;
pub mod executor;
pub mod http;
pub mod model;
pub mod retry;

pub use error::ActionError;
pub use executor::{ActionExecutor, ActionOutcome};
pub use model::{Action, ActionKind, BashAction, CustomAction, ExpectStatus, HttpAction};
pub use retry::{RetryConfig, RetryPredicate};
