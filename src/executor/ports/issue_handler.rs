//! Issue handler port turning issues into follow-up tasks.

use crate::task::{
    domain::{Issue, IssueKind, TaskId},
    services::TaskContextError,
};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for issue handler operations.
pub type IssueHandlerResult<T> = Result<T, IssueHandlerError>;

/// Resolves issues raised by tasks.
#[async_trait]
pub trait IssueHandler: Send + Sync {
    /// Creates an issue record for `task_id`.
    fn specify(&self, kind: IssueKind, description: &str, task_id: TaskId) -> Issue {
        Issue::specify(kind, description, task_id)
    }

    /// Attempts to resolve `issue`, returning whether it succeeded.
    ///
    /// A successful resolution creates a follow-up task, updates the
    /// referenced task and marks `issue` resolved with a solution note.
    ///
    /// # Errors
    ///
    /// Returns [`IssueHandlerError::Context`] when the task context fails.
    async fn resolve(&self, issue: &mut Issue) -> IssueHandlerResult<bool>;
}

/// Errors returned by issue handlers.
#[derive(Debug, Error)]
pub enum IssueHandlerError {
    /// Task context operation failed.
    #[error(transparent)]
    Context(#[from] TaskContextError),
}
