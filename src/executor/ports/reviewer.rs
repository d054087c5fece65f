//! Optional reviewer consulted before a task closes.

use super::worker::WorkerResult;
use crate::executor::domain::Review;
use crate::task::domain::{Task, TaskResults};
use async_trait::async_trait;

/// Evaluates the mapped results of a task.
///
/// A rejection sends the task back to its run phase with the reviewer's
/// remarks appended to the feedback.
#[async_trait]
pub trait ResultReviewer: Send + Sync {
    /// Reviews `results` produced for `task`.
    async fn review(&self, task: &Task, results: &TaskResults) -> WorkerResult<Review>;
}
