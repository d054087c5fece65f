//! Execution services: the generic task manager, its two roles, the
//! project runner and the decomposition service.

mod context;
mod decompose;
mod error;
mod manager;
mod pipeline;
mod project;
mod single;

pub use context::ExecutionContext;
pub use decompose::DecompositionService;
pub use error::{ManagerError, ManagerResult};
pub use manager::{ExecutionPhases, TaskManager};
pub use pipeline::PipelinePhases;
pub use project::ProjectRunner;
pub use single::SingleTaskPhases;
