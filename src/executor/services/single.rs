//! Phases of a manager executing a single task through a worker.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::context::ExecutionContext;
use super::error::{ManagerError, ManagerResult};
use super::manager::ExecutionPhases;
use crate::executor::{
    domain::{
        ManagerRole, ResourcePool, Review, RunOutput, ShutdownOutcome, StartupOutcome, WorkerInput,
        map_outputs,
    },
    ports::{AgentRegistryError, Worker},
};
use crate::task::domain::{IssueKind, IssueReport, Task};

/// Loads the task's agent at startup, hands it the rendered input and maps
/// its output onto the declared outputs.
#[derive(Default)]
pub struct SingleTaskPhases {
    worker: Option<Arc<dyn Worker>>,
}

impl fmt::Debug for SingleTaskPhases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleTaskPhases")
            .field("worker_loaded", &self.worker.is_some())
            .finish()
    }
}

impl SingleTaskPhases {
    /// Creates phases that resolve the worker through the agent registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates phases bound to `worker`, bypassing the registry.
    #[must_use]
    pub fn with_worker(worker: Arc<dyn Worker>) -> Self {
        Self {
            worker: Some(worker),
        }
    }
}

#[async_trait]
impl ExecutionPhases for SingleTaskPhases {
    fn role(&self) -> ManagerRole {
        ManagerRole::Execution
    }

    async fn startup(
        &mut self,
        context: &ExecutionContext,
        task: &mut Task,
        _resources: &mut ResourcePool,
    ) -> ManagerResult<StartupOutcome> {
        if self.worker.is_some() {
            return Ok(StartupOutcome::Ready);
        }

        let agent = if let Some(assigned) = task.relations().agent() {
            assigned.clone()
        } else {
            let Some(fallback) = context.default_agent() else {
                return Ok(StartupOutcome::Issue(IssueReport::new(
                    IssueKind::Competence,
                    "no agent assigned to task",
                )));
            };
            let clock = context.clock();
            let assigned = fallback.clone();
            task.update_relations(clock.as_ref(), |relations| {
                relations.set_agent(Some(assigned));
            });
            fallback
        };

        match context.agents().load(&agent).await {
            Ok(worker) => {
                debug!(task_id = %task.id(), agent = %agent, "worker loaded");
                self.worker = Some(worker);
                Ok(StartupOutcome::Ready)
            }
            Err(AgentRegistryError::UnknownAgent(name)) => Ok(StartupOutcome::Issue(
                IssueReport::new(IssueKind::Competence, format!("agent {name} not found")),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn run(
        &mut self,
        _context: &ExecutionContext,
        task: &mut Task,
        resources: &mut ResourcePool,
    ) -> ManagerResult<RunOutput> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| ManagerError::MissingWorker(task.id()))?;
        let input = WorkerInput::build(task, resources)?;
        debug!(task_id = %task.id(), inputs = input.resources.len(), "running worker");
        Ok(worker.run(&input).await?)
    }

    async fn shutdown(
        &mut self,
        context: &ExecutionContext,
        task: &Task,
        raw: Value,
    ) -> ManagerResult<ShutdownOutcome> {
        let results =
            map_outputs(task.outputs(), raw).ok_or_else(|| ManagerError::OutputMismatch {
                task_id: task.id(),
                expected: task.outputs().to_vec(),
            })?;
        let Some(reviewer) = context.reviewer() else {
            return Ok(ShutdownOutcome::Accepted(results));
        };
        match reviewer.review(task, &results).await? {
            Review::Accept => Ok(ShutdownOutcome::Accepted(results)),
            Review::Reject(remarks) => Ok(ShutdownOutcome::Rejected(remarks)),
        }
    }
}
