//! In-memory agent registry.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::executor::ports::{AgentRegistry, AgentRegistryError, AgentRegistryResult, Worker};
use crate::task::domain::AgentName;

/// Thread-safe registry of named workers.
#[derive(Clone, Default)]
pub struct InMemoryAgentRegistry {
    workers: Arc<RwLock<BTreeMap<AgentName, Arc<dyn Worker>>>>,
    default_agent: Option<AgentName>,
}

impl fmt::Debug for InMemoryAgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAgentRegistry")
            .field("default_agent", &self.default_agent)
            .finish_non_exhaustive()
    }
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry without a default agent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `worker` under `name`.
    #[must_use]
    pub fn with_worker(self, name: AgentName, worker: Arc<dyn Worker>) -> Self {
        if let Ok(mut workers) = self.workers.write() {
            workers.insert(name, worker);
        }
        self
    }

    /// Sets the agent used for tasks without an agent relation.
    #[must_use]
    pub fn with_default_agent(mut self, name: AgentName) -> Self {
        self.default_agent = Some(name);
        self
    }

    /// Registers `worker` under `name`, replacing any earlier worker.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::Persistence`] when the lock is poisoned.
    pub fn register(&self, name: AgentName, worker: Arc<dyn Worker>) -> AgentRegistryResult<()> {
        let mut workers = self.workers.write().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        workers.insert(name, worker);
        Ok(())
    }

    /// Returns the registered agent names in order.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::Persistence`] when the lock is poisoned.
    pub fn names(&self) -> AgentRegistryResult<Vec<AgentName>> {
        let workers = self.workers.read().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(workers.keys().cloned().collect())
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn load(&self, name: &AgentName) -> AgentRegistryResult<Arc<dyn Worker>> {
        let workers = self.workers.read().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        workers
            .get(name)
            .cloned()
            .ok_or_else(|| AgentRegistryError::UnknownAgent(name.clone()))
    }

    fn default_agent(&self) -> Option<AgentName> {
        self.default_agent.clone()
    }
}
