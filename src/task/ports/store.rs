//! Key-value store port holding authoritative task content.

use crate::task::domain::{Task, TaskId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Durable map from task id to task record.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts or replaces a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the backend fails.
    async fn put(&self, task: &Task) -> TaskStoreResult<()>;

    /// Returns the task with `id`, or `None` when absent.
    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns the tasks for `ids` in order, `None` for missing entries.
    async fn get_many(&self, ids: &[TaskId]) -> TaskStoreResult<Vec<Option<Task>>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            found.push(self.get(*id).await?);
        }
        Ok(found)
    }

    /// Returns every stored task keyed by id.
    async fn get_all(&self) -> TaskStoreResult<BTreeMap<TaskId, Task>>;

    /// Removes the task with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn delete(&self, id: TaskId) -> TaskStoreResult<()>;

    /// Replaces the whole store content.
    async fn load(&self, tasks: BTreeMap<TaskId, Task>) -> TaskStoreResult<()>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
