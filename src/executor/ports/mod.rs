//! Port contracts for the collaborators a task manager drives.
//!
//! Workers, the agent registry, the issue handler, the optional result
//! reviewer and the decomposer are all external to the execution engine.

pub mod decomposer;
pub mod issue_handler;
pub mod registry;
pub mod reviewer;
pub mod worker;

pub use decomposer::{Breakdown, Decomposer};
pub use issue_handler::{IssueHandler, IssueHandlerError, IssueHandlerResult};
pub use registry::{AgentRegistry, AgentRegistryError, AgentRegistryResult};
pub use reviewer::ResultReviewer;
pub use worker::{Worker, WorkerError, WorkerResult};
