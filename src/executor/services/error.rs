//! Errors surfaced by the execution services.

use crate::executor::ports::{AgentRegistryError, WorkerError};
use crate::message::error::MessagingError;
use crate::task::{
    domain::{TaskId, TaskType},
    services::TaskContextError,
};
use thiserror::Error;

/// Errors returned by task managers, the project runner and the
/// decomposition service.
///
/// Failures inside a task's run phase never surface here; they become
/// execution issues on the task instead.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Task context operation failed.
    #[error(transparent)]
    Context(#[from] TaskContextError),

    /// Message routing failed.
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// A worker, reviewer or decomposer failed outside a run phase.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The agent registry failed.
    #[error(transparent)]
    Registry(#[from] AgentRegistryError),

    /// The worker prompt could not be rendered.
    #[error("failed to render worker input: {0}")]
    Prompt(#[from] minijinja::Error),

    /// A multi-output task produced a result lacking its declared outputs.
    #[error("task {task_id} declares outputs [{}] but the result is not an object holding all of them", .expected.join(", "))]
    OutputMismatch {
        /// Task whose shutdown failed.
        task_id: TaskId,
        /// Declared output keys.
        expected: Vec<String>,
    },

    /// The run phase was entered before startup loaded a worker.
    #[error("no worker loaded for task {0}")]
    MissingWorker(TaskId),

    /// No pipeline under the project root can start.
    #[error("no pipeline is ready to run")]
    NoReadyPipelines,

    /// The task type has no child type to decompose into.
    #[error("{} tasks cannot be decomposed", .0.as_str())]
    NotDecomposable(TaskType),
}

/// Result type for execution services.
pub type ManagerResult<T> = Result<T, ManagerError>;
