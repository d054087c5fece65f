//! Collaborators shared by every manager of one execution.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use mockable::Clock;

use crate::config::EngineConfig;
use crate::executor::{
    adapters::SimpleIssueHandler,
    ports::{AgentRegistry, IssueHandler, ResultReviewer},
};
use crate::message::services::Communicator;
use crate::task::{domain::AgentName, services::TaskContextStore};

const DEFAULT_MAX_SHUTDOWN_RETRIES: u32 = 3;

/// Explicitly injected dependencies of the task managers.
///
/// Cloning is cheap; every collaborator is shared.
#[derive(Clone)]
pub struct ExecutionContext {
    store: Arc<TaskContextStore>,
    communicator: Arc<Communicator>,
    issue_handler: Arc<dyn IssueHandler>,
    agents: Arc<dyn AgentRegistry>,
    reviewer: Option<Arc<dyn ResultReviewer>>,
    default_agent: Option<AgentName>,
    max_shutdown_retries: u32,
    persist_path: Option<Utf8PathBuf>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("communicator", &self.communicator)
            .field("has_reviewer", &self.reviewer.is_some())
            .field("default_agent", &self.default_agent)
            .field("max_shutdown_retries", &self.max_shutdown_retries)
            .field("persist_path", &self.persist_path)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Creates a context from its required collaborators.
    #[must_use]
    pub fn new(
        store: Arc<TaskContextStore>,
        communicator: Arc<Communicator>,
        issue_handler: Arc<dyn IssueHandler>,
        agents: Arc<dyn AgentRegistry>,
    ) -> Self {
        Self {
            store,
            communicator,
            issue_handler,
            agents,
            reviewer: None,
            default_agent: None,
            max_shutdown_retries: DEFAULT_MAX_SHUTDOWN_RETRIES,
            persist_path: None,
        }
    }

    /// Creates an unattended context: auto-approving communicator and the
    /// simple issue handler.
    #[must_use]
    pub fn non_interactive(store: Arc<TaskContextStore>, agents: Arc<dyn AgentRegistry>) -> Self {
        let issue_handler = Arc::new(SimpleIssueHandler::new(Arc::clone(&store)));
        Self::new(
            store,
            Arc::new(Communicator::non_interactive()),
            issue_handler,
            agents,
        )
    }

    /// Consults `reviewer` before closing single tasks.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn ResultReviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    /// Assigns `agent` to tasks without an agent relation, taking precedence
    /// over the registry's default.
    #[must_use]
    pub fn with_default_agent(mut self, agent: AgentName) -> Self {
        self.default_agent = Some(agent);
        self
    }

    /// Sets how many rejected shutdowns are tolerated.
    #[must_use]
    pub const fn with_max_shutdown_retries(mut self, retries: u32) -> Self {
        self.max_shutdown_retries = retries;
        self
    }

    /// Writes a snapshot to `path` after every terminal transition.
    #[must_use]
    pub fn with_persist_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    /// Applies the retry bound, persistence and default agent settings of
    /// `config`. A configured default agent replaces one set earlier.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.max_shutdown_retries = config.max_shutdown_retries;
        self.persist_path = config.snapshot_path().map(Utf8Path::to_owned);
        if let Some(agent) = &config.default_agent {
            self.default_agent = Some(agent.clone());
        }
        self
    }

    /// Task context store.
    #[must_use]
    pub const fn store(&self) -> &Arc<TaskContextStore> {
        &self.store
    }

    /// Message router.
    #[must_use]
    pub const fn communicator(&self) -> &Arc<Communicator> {
        &self.communicator
    }

    /// Issue handler.
    #[must_use]
    pub const fn issue_handler(&self) -> &Arc<dyn IssueHandler> {
        &self.issue_handler
    }

    /// Agent registry.
    #[must_use]
    pub const fn agents(&self) -> &Arc<dyn AgentRegistry> {
        &self.agents
    }

    /// Agent for tasks without an agent relation: the configured default,
    /// else the registry's.
    #[must_use]
    pub fn default_agent(&self) -> Option<AgentName> {
        self.default_agent
            .clone()
            .or_else(|| self.agents.default_agent())
    }

    /// Result reviewer, when configured.
    #[must_use]
    pub const fn reviewer(&self) -> Option<&Arc<dyn ResultReviewer>> {
        self.reviewer.as_ref()
    }

    /// Rejected shutdowns tolerated before the task ends in an issue.
    #[must_use]
    pub const fn max_shutdown_retries(&self) -> u32 {
        self.max_shutdown_retries
    }

    /// Snapshot path, when persistence is enabled.
    #[must_use]
    pub fn persist_path(&self) -> Option<&Utf8Path> {
        self.persist_path.as_deref()
    }

    /// Clock used to stamp task mutations.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.store.clock()
    }
}
