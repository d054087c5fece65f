//! Worker port: runs a task and returns a result or an issue.

use crate::executor::domain::{RunOutput, WorkerInput};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Capability-backed executor bound to a task through its agent relation.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Runs the task described by `input`.
    ///
    /// # Errors
    ///
    /// Any error is converted by the task manager into an execution issue
    /// whose description is the error message.
    async fn run(&self, input: &WorkerInput) -> WorkerResult<RunOutput>;
}

/// Errors raised by workers, reviewers and decomposers.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The worker failed with a message.
    #[error("{0}")]
    Failed(String),

    /// Backend failure.
    #[error("worker backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkerError {
    /// Creates a failure with `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
