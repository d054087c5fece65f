//! Shared world state for pipeline execution scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::fixture;
use taskforge::executor::services::ExecutionContext;
use taskforge::task::{
    domain::{Task, TaskId},
    services::TaskContextStore,
};

use crate::test_helpers::{Script, ScriptedWorker, new_store, unattended_context};

/// Scenario world for pipeline behaviour tests.
pub struct PipelineWorld {
    pub store: Arc<TaskContextStore>,
    pub pipeline: Option<Task>,
    pub subtasks: BTreeMap<String, TaskId>,
    pub scripts: Vec<(String, Script)>,
    pub worker: Option<Arc<ScriptedWorker>>,
    pub context: Option<ExecutionContext>,
}

impl PipelineWorld {
    /// Creates a world with an empty context store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: new_store(),
            pipeline: None,
            subtasks: BTreeMap::new(),
            scripts: Vec::new(),
            worker: None,
            context: None,
        }
    }

    /// Returns the execution context, wiring the scripted worker on first
    /// use.
    pub fn context(&mut self) -> ExecutionContext {
        if let Some(context) = &self.context {
            return context.clone();
        }
        let worker = Arc::new(
            self.scripts
                .iter()
                .fold(ScriptedWorker::new(), |worker, (objective, script)| {
                    worker.on(objective, script.clone())
                }),
        );
        let context = unattended_context(&self.store, Arc::clone(&worker));
        self.worker = Some(worker);
        self.context = Some(context.clone());
        context
    }

    /// Returns the pipeline under test.
    pub fn pipeline(&self) -> Result<&Task, eyre::Report> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing pipeline in scenario world"))
    }

    /// Returns the id of the named subtask.
    pub fn subtask(&self, name: &str) -> Result<TaskId, eyre::Report> {
        self.subtasks
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown subtask {name}"))
    }
}

impl Default for PipelineWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PipelineWorld {
    PipelineWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
