//! In-memory task store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<BTreeMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put(&self, task: &Task) -> TaskStoreResult<()> {
        let mut tasks = self.state.write().map_err(poisoned)?;
        tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let tasks = self.state.read().map_err(poisoned)?;
        Ok(tasks.get(&id).cloned())
    }

    async fn get_all(&self) -> TaskStoreResult<BTreeMap<TaskId, Task>> {
        let tasks = self.state.read().map_err(poisoned)?;
        Ok(tasks.clone())
    }

    async fn delete(&self, id: TaskId) -> TaskStoreResult<()> {
        let mut tasks = self.state.write().map_err(poisoned)?;
        tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(TaskStoreError::NotFound(id))
    }

    async fn load(&self, loaded: BTreeMap<TaskId, Task>) -> TaskStoreResult<()> {
        let mut tasks = self.state.write().map_err(poisoned)?;
        *tasks = loaded;
        Ok(())
    }
}
