//! Agent registry port resolving agent names to workers.

use super::worker::Worker;
use crate::task::domain::AgentName;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent registry operations.
pub type AgentRegistryResult<T> = Result<T, AgentRegistryError>;

/// Named collection of workers.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Loads the worker registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::UnknownAgent`] when no worker has that
    /// name.
    async fn load(&self, name: &AgentName) -> AgentRegistryResult<Arc<dyn Worker>>;

    /// Agent used for tasks without an agent relation.
    fn default_agent(&self) -> Option<AgentName>;
}

/// Errors returned by agent registries.
#[derive(Debug, Clone, Error)]
pub enum AgentRegistryError {
    /// No worker is registered under the name.
    #[error("agent {0} not found")]
    UnknownAgent(AgentName),

    /// Registry backend failure.
    #[error("agent registry error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentRegistryError {
    /// Wraps a backend error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
