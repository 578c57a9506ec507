//! `engine` crate — workflow domain models, the document parser, trigger
//! state machines, the execution pipeline, and the agent supervisor.

pub mod agent;
pub mod error;
pub mod execlog;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod runtime;
pub mod trigger;

pub use agent::{Agent, AgentOptions};
pub use error::EngineError;
pub use models::{Trigger, TriggerKind, WatchEvent, Workflow};
pub use parser::{parse_workflow_file, parse_workflow_str, ParsedWorkflow};
pub use registry::{RuntimeWorkflowInfo, WorkflowRegistry, WorkflowStatus};
pub use runtime::WorkflowRuntime;
