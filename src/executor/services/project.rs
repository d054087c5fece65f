//! Project runner: executes the pipelines below the project root.

use tracing::{debug, info, warn};

use super::context::ExecutionContext;
use super::error::{ManagerError, ManagerResult};
use super::manager::TaskManager;
use super::pipeline::PipelinePhases;
use crate::executor::domain::ResourcePool;
use crate::message::domain::{MessageKind, Payload};
use crate::task::domain::{Task, TaskStatus};

/// Resolves the issue backlog, then runs every pipeline under the root whose
/// inputs the project pool satisfies, in rounds, until none is left.
#[derive(Debug)]
pub struct ProjectRunner {
    context: ExecutionContext,
    resources: ResourcePool,
}

impl ProjectRunner {
    /// Creates a runner with an empty project pool.
    #[must_use]
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            resources: ResourcePool::new(),
        }
    }

    /// Seeds the project pool.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourcePool) -> Self {
        self.resources = resources;
        self
    }

    /// Project pool, including the results of closed pipelines.
    #[must_use]
    pub const fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    /// Runs the project and returns the pipelines executed, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoReadyPipelines`] when open pipelines exist
    /// but none can start, and propagates context and manager failures.
    pub async fn run(&mut self) -> ManagerResult<Vec<Task>> {
        self.resolve_backlog().await?;

        let root = self.context.store().root_id()?;
        let mut remaining = Vec::new();
        for pipeline in self.context.store().children_of(root).await? {
            if pipeline.status() != TaskStatus::Closed {
                remaining.push(pipeline);
                continue;
            }
            if let Some(results) = pipeline.results() {
                self.resources.merge(results);
            }
        }

        let mut executed = Vec::new();
        while !remaining.is_empty() {
            let (ready, waiting): (Vec<Task>, Vec<Task>) = remaining
                .into_iter()
                .partition(|pipeline| self.resources.satisfies(pipeline));
            if ready.is_empty() {
                if executed.is_empty() {
                    return Err(ManagerError::NoReadyPipelines);
                }
                debug!(waiting = waiting.len(), "pipelines left waiting for inputs");
                break;
            }
            remaining = waiting;
            for pipeline in ready {
                executed.push(self.execute_pipeline(pipeline).await?);
            }
        }
        info!(root = %root, executed = executed.len(), "project run finished");
        Ok(executed)
    }

    async fn resolve_backlog(&self) -> ManagerResult<()> {
        let communicator = self.context.communicator();
        if !communicator.handles(MessageKind::Issue) {
            return Ok(());
        }
        for message in communicator.fetch_all(MessageKind::Issue).await? {
            let Payload::Issue(mut issue) = message.into_payload() else {
                continue;
            };
            match self.context.issue_handler().resolve(&mut issue).await {
                Ok(true) => debug!(
                    issue_id = %issue.id(),
                    solution = issue.solution().unwrap_or_default(),
                    "backlog issue resolved"
                ),
                Ok(false) => warn!(issue_id = %issue.id(), "backlog issue left unresolved"),
                Err(err) => warn!(issue_id = %issue.id(), error = %err, "issue handler failed"),
            }
        }
        Ok(())
    }

    async fn execute_pipeline(&mut self, pipeline: Task) -> ManagerResult<Task> {
        let mut prepared = pipeline;
        if prepared.relations().agent().is_none()
            && let Some(agent) = self.context.default_agent()
        {
            let clock = self.context.clock();
            prepared.update_relations(clock.as_ref(), |relations| {
                relations.set_agent(Some(agent));
            });
            prepared = self.context.store().update_task(&prepared).await?;
        }

        info!(task_id = %prepared.id(), name = prepared.name(), "starting pipeline");
        let mut manager = TaskManager::new(prepared, self.context.clone(), PipelinePhases::new())
            .with_resources(self.resources.clone());
        let finished = manager.run().await?;
        if finished.status() == TaskStatus::Closed
            && let Some(results) = finished.results()
        {
            self.resources.merge(results);
        }
        Ok(finished)
    }
}
