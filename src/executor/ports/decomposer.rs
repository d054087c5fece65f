//! Decomposer port breaking an objective into tasks.

use super::worker::WorkerResult;
use crate::task::domain::{Task, TaskType};
use async_trait::async_trait;

/// A parent task and its ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    /// Task representing the whole objective.
    pub parent: Task,
    /// Children in execution order.
    pub children: Vec<Task>,
}

/// External service that breaks an objective down one level.
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Breaks `objective` into a parent of `parent_type` and its children.
    async fn breakdown(&self, objective: &str, parent_type: TaskType) -> WorkerResult<Breakdown>;
}
