//! Phases of a supervisor scheduling the subtasks of a pipeline.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::context::ExecutionContext;
use super::error::{ManagerError, ManagerResult};
use super::manager::{ExecutionPhases, TaskManager};
use super::single::SingleTaskPhases;
use crate::executor::domain::{
    ManagerRole, ResourcePool, RunOutput, ShutdownOutcome, StartupOutcome,
};
use crate::task::domain::{IssueKind, IssueReport, Task, TaskId, TaskStatus};

/// Runs every ready descendant until none is left.
///
/// A descendant is ready once each of its declared inputs is in the shared
/// pool. Ready tasks run one after another, each through a fresh
/// single-task manager working on a copy of the pool; closed tasks merge
/// their results back. Descendants already closed by an earlier run count
/// as closed without running again.
#[derive(Debug, Default)]
pub struct PipelinePhases {
    subordinates: Option<Vec<TaskId>>,
    closed: Vec<TaskId>,
    blocked: Vec<TaskId>,
}

impl PipelinePhases {
    /// Creates phases with no scheduling history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Descendants that closed during the run.
    #[must_use]
    pub fn closed(&self) -> &[TaskId] {
        &self.closed
    }

    /// Descendants that ended without closing.
    #[must_use]
    pub fn blocked(&self) -> &[TaskId] {
        &self.blocked
    }

    fn subordinates(&mut self, context: &ExecutionContext, pipeline: TaskId) -> ManagerResult<Vec<TaskId>> {
        if let Some(cached) = &self.subordinates {
            return Ok(cached.clone());
        }
        let descendants = context.store().descendants_of(pipeline)?;
        self.subordinates = Some(descendants.clone());
        Ok(descendants)
    }

    fn is_settled(&self, id: TaskId) -> bool {
        self.closed.contains(&id) || self.blocked.contains(&id)
    }

    async fn load_pending(
        &self,
        context: &ExecutionContext,
        subordinates: &[TaskId],
    ) -> ManagerResult<Vec<Task>> {
        let pending: Vec<TaskId> = subordinates
            .iter()
            .copied()
            .filter(|id| !self.is_settled(*id))
            .collect();
        let tasks = context.store().get_tasks(&pending).await?;
        Ok(tasks.into_iter().flatten().collect())
    }

    /// Counts descendants closed by an earlier run as closed.
    async fn resume_closed(
        &mut self,
        context: &ExecutionContext,
        subordinates: &[TaskId],
        resources: &mut ResourcePool,
    ) -> ManagerResult<()> {
        for task in self.load_pending(context, subordinates).await? {
            if task.status() == TaskStatus::Closed {
                if let Some(results) = task.results() {
                    resources.merge(results);
                }
                self.closed.push(task.id());
            }
        }
        Ok(())
    }

    async fn ready_tasks(
        &self,
        context: &ExecutionContext,
        subordinates: &[TaskId],
        resources: &ResourcePool,
    ) -> ManagerResult<Vec<Task>> {
        let pending = self.load_pending(context, subordinates).await?;
        Ok(pending
            .into_iter()
            .filter(|task| resources.satisfies(task))
            .collect())
    }

    async fn execute_subtask(
        &mut self,
        context: &ExecutionContext,
        subtask: Task,
        resources: &mut ResourcePool,
    ) -> ManagerResult<()> {
        let subtask_id = subtask.id();
        let mut manager = TaskManager::new(subtask, context.clone(), SingleTaskPhases::new())
            .with_resources(resources.without_feedback());
        let finished = manager.run().await?;
        if finished.status() == TaskStatus::Closed {
            if let Some(results) = finished.results() {
                resources.merge(results);
            }
            debug!(task_id = %subtask_id, "subtask closed");
            self.closed.push(subtask_id);
        } else {
            warn!(task_id = %subtask_id, status = finished.status().as_str(), "subtask did not close");
            self.blocked.push(subtask_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionPhases for PipelinePhases {
    fn role(&self) -> ManagerRole {
        ManagerRole::Supervisor
    }

    async fn startup(
        &mut self,
        context: &ExecutionContext,
        task: &mut Task,
        _resources: &mut ResourcePool,
    ) -> ManagerResult<StartupOutcome> {
        let subordinates = self.subordinates(context, task.id())?;
        debug!(task_id = %task.id(), subtasks = subordinates.len(), "pipeline prepared");
        Ok(StartupOutcome::Ready)
    }

    async fn run(
        &mut self,
        context: &ExecutionContext,
        task: &mut Task,
        resources: &mut ResourcePool,
    ) -> ManagerResult<RunOutput> {
        let subordinates = self.subordinates(context, task.id())?;
        self.resume_closed(context, &subordinates, resources).await?;

        loop {
            let ready = self.ready_tasks(context, &subordinates, resources).await?;
            if ready.is_empty() {
                break;
            }
            for subtask in ready {
                self.execute_subtask(context, subtask, resources).await?;
            }
        }

        if self.closed.len() == subordinates.len() {
            let mut outputs = Map::new();
            for key in task.outputs() {
                let Some(value) = resources.get(key) else {
                    return Ok(RunOutput::Issue(IssueReport::new(
                        IssueKind::Resource,
                        format!("output {key} is missing from the resource pool"),
                    )));
                };
                outputs.insert(key.clone(), value.clone());
            }
            info!(task_id = %task.id(), closed = self.closed.len(), "pipeline completed");
            return Ok(RunOutput::Completed(Value::Object(outputs)));
        }

        warn!(
            task_id = %task.id(),
            closed = self.closed.len(),
            blocked = self.blocked.len(),
            "pipeline blocked"
        );
        task.set_status(TaskStatus::Blocked, context.clock().as_ref());
        Ok(RunOutput::Issue(IssueReport::new(
            IssueKind::Blocked,
            "unable to finish subtasks",
        )))
    }

    async fn shutdown(
        &mut self,
        _context: &ExecutionContext,
        task: &Task,
        raw: Value,
    ) -> ManagerResult<ShutdownOutcome> {
        match raw {
            Value::Object(outputs) => Ok(ShutdownOutcome::Accepted(outputs.into_iter().collect())),
            _ => Err(ManagerError::OutputMismatch {
                task_id: task.id(),
                expected: task.outputs().to_vec(),
            }),
        }
    }
}
