//! Generic task manager: the startup, run and shutdown protocol shared by
//! every manager role.
//!
//! The protocol for one task:
//!
//! 1. Triage queued issues: issues raised by descendants go to the issue
//!    handler, everything else is escalated unchanged.
//! 2. Fold pending messages into the task. Only feedback can change the
//!    status; every message body lands in the `feedback` resource.
//! 3. Unless the task is now `APPROVED`, stop with an approval issue.
//! 4. Run the role-specific phases. Any error from the run phase becomes an
//!    execution issue. A rejected shutdown repeats the run phase with the
//!    rejection appended to the feedback, up to the configured bound.
//! 5. Persist the terminal state through the task context store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Level, debug, error, info, warn};

use super::context::ExecutionContext;
use super::error::{ManagerError, ManagerResult};
use crate::executor::domain::{
    ManagerRole, ResourcePool, RunOutput, ShutdownOutcome, StartupOutcome,
};
use crate::message::domain::{Message, MessageKind, Payload};
use crate::task::{
    domain::{Issue, IssueKind, IssueReport, Task, TaskResults, TaskStatus},
    services::TaskContextError,
};

/// Role-specific behaviour plugged into [`TaskManager`].
#[async_trait]
pub trait ExecutionPhases: Send {
    /// Role reported in logs.
    fn role(&self) -> ManagerRole;

    /// Prepares the run phase of an approved task.
    async fn startup(
        &mut self,
        context: &ExecutionContext,
        task: &mut Task,
        resources: &mut ResourcePool,
    ) -> ManagerResult<StartupOutcome>;

    /// Performs the work. Errors are converted into execution issues.
    async fn run(
        &mut self,
        context: &ExecutionContext,
        task: &mut Task,
        resources: &mut ResourcePool,
    ) -> ManagerResult<RunOutput>;

    /// Validates the raw output and maps it onto the declared outputs.
    async fn shutdown(
        &mut self,
        context: &ExecutionContext,
        task: &Task,
        raw: Value,
    ) -> ManagerResult<ShutdownOutcome>;
}

enum Completion {
    Closed(TaskResults),
    Raised(IssueReport),
}

/// Drives one task through its lifecycle.
#[derive(Debug)]
pub struct TaskManager<P> {
    task: Task,
    resources: ResourcePool,
    context: ExecutionContext,
    phases: P,
}

impl<P: ExecutionPhases> TaskManager<P> {
    /// Creates a manager for `task` with an empty resource pool.
    #[must_use]
    pub fn new(task: Task, context: ExecutionContext, phases: P) -> Self {
        Self {
            task,
            resources: ResourcePool::new(),
            context,
            phases,
        }
    }

    /// Replaces the resource pool.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourcePool) -> Self {
        self.resources = resources;
        self
    }

    /// Task as last seen by the manager.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Resource pool after the run.
    #[must_use]
    pub const fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    /// Role-specific phase state.
    #[must_use]
    pub const fn phases(&self) -> &P {
        &self.phases
    }

    /// Runs the full protocol and returns the persisted terminal task.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError`] for infrastructure failures outside the run
    /// phase and for output mapping errors. Failures of the work itself are
    /// reported as issues on the returned task.
    pub async fn run(&mut self) -> ManagerResult<Task> {
        let task_id = self.task.id();
        info!(task_id = %task_id, role = self.phases.role().as_str(), "task manager started");
        if tracing::enabled!(Level::DEBUG) {
            let tree = self
                .context
                .store()
                .repr_current_context(Some(task_id))
                .await?;
            debug!(task_id = %task_id, "current context\n{tree}");
        }

        self.triage_issues().await?;
        self.fold_messages().await?;
        let completion = if self.task.status() == TaskStatus::Approved {
            self.execute().await?
        } else {
            Completion::Raised(IssueReport::new(IssueKind::Approval, "waiting for approval"))
        };

        let clock = self.context.clock();
        match completion {
            Completion::Closed(results) => {
                self.task.set_results(results, clock.as_ref());
                self.task.set_status(TaskStatus::Closed, clock.as_ref());
            }
            Completion::Raised(report) => self.raise(report).await?,
        }
        self.finish().await
    }

    async fn execute(&mut self) -> ManagerResult<Completion> {
        let startup = self
            .phases
            .startup(&self.context, &mut self.task, &mut self.resources)
            .await?;
        if let StartupOutcome::Issue(report) = startup {
            return Ok(Completion::Raised(report));
        }

        let mut rejections: u32 = 0;
        loop {
            let raw = match self
                .phases
                .run(&self.context, &mut self.task, &mut self.resources)
                .await
            {
                Ok(RunOutput::Completed(raw)) => raw,
                Ok(RunOutput::Issue(report)) => return Ok(Completion::Raised(report)),
                Err(err) => {
                    error!(task_id = %self.task.id(), error = %err, "execution failed");
                    return Ok(Completion::Raised(IssueReport::new(
                        IssueKind::Exec,
                        err.to_string(),
                    )));
                }
            };

            match self.phases.shutdown(&self.context, &self.task, raw).await? {
                ShutdownOutcome::Accepted(results) => return Ok(Completion::Closed(results)),
                ShutdownOutcome::Rejected(remarks) => {
                    rejections = rejections.saturating_add(1);
                    if rejections > self.context.max_shutdown_retries() {
                        return Ok(Completion::Raised(IssueReport::new(
                            IssueKind::Competence,
                            format!("result rejected {rejections} times: {remarks}"),
                        )));
                    }
                    warn!(
                        task_id = %self.task.id(),
                        attempt = rejections,
                        "result rejected, repeating execution"
                    );
                    self.resources.append_feedback(&remarks);
                }
            }
        }
    }

    /// Links and escalates an issue raised by this task.
    ///
    /// A blocked issue leaves the task `BLOCKED`; every other kind moves it
    /// to `ISSUE`.
    async fn raise(&mut self, report: IssueReport) -> ManagerResult<()> {
        let issue = self.context.issue_handler().specify(
            report.kind(),
            report.description(),
            self.task.id(),
        );
        let status = if issue.kind() == IssueKind::Blocked {
            TaskStatus::Blocked
        } else {
            TaskStatus::Issue
        };
        warn!(
            task_id = %self.task.id(),
            issue_id = %issue.id(),
            kind = issue.kind().as_str(),
            description = issue.description(),
            "issue raised"
        );

        let clock = self.context.clock();
        self.task.link_issue(&issue, clock.as_ref());
        self.task.set_status(status, clock.as_ref());
        self.escalate(issue).await
    }

    async fn escalate(&self, issue: Issue) -> ManagerResult<()> {
        let communicator = self.context.communicator();
        if !communicator.handles(MessageKind::Issue) {
            warn!(issue_id = %issue.id(), "no issue channel registered, issue not escalated");
            return Ok(());
        }
        communicator.submit_message(Message::issue(issue)).await?;
        Ok(())
    }

    /// Resolves queued issues raised below this task and escalates the rest.
    async fn triage_issues(&self) -> ManagerResult<()> {
        let communicator = self.context.communicator();
        if !communicator.handles(MessageKind::Issue) {
            return Ok(());
        }
        let queued = communicator.fetch_all(MessageKind::Issue).await?;
        if queued.is_empty() {
            return Ok(());
        }

        let descendants: BTreeSet<_> = self
            .context
            .store()
            .descendants_of(self.task.id())?
            .into_iter()
            .collect();
        for message in queued {
            let source = message.header().source_task();
            let Payload::Issue(mut issue) = message.into_payload() else {
                continue;
            };
            if !source.is_some_and(|id| descendants.contains(&id)) {
                debug!(task_id = %self.task.id(), issue_id = %issue.id(), "issue outside this subtree, escalating");
                self.escalate(issue).await?;
                continue;
            }

            let resolved = match self.context.issue_handler().resolve(&mut issue).await {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(issue_id = %issue.id(), error = %err, "issue handler failed");
                    false
                }
            };
            if resolved {
                info!(
                    task_id = %self.task.id(),
                    issue_id = %issue.id(),
                    solution = issue.solution().unwrap_or_default(),
                    "issue resolved"
                );
            } else {
                self.escalate(issue.reassigned_to(self.task.id())).await?;
            }
        }
        Ok(())
    }

    /// Applies pending messages to the task status and feedback.
    async fn fold_messages(&mut self) -> ManagerResult<()> {
        let fetched = self
            .context
            .communicator()
            .fetch_all_for_task(&self.task)
            .await?;
        let clock = self.context.clock();
        let mut feedback = String::new();
        for (kind, messages) in fetched {
            if kind == MessageKind::Feedback {
                for message in &messages {
                    if let Payload::Feedback(payload) = message.payload() {
                        self.task.set_status(payload.status, clock.as_ref());
                        if !payload.feedback.is_empty() {
                            feedback.push_str(&format!("USER FEEDBACK: {}\n", payload.feedback));
                        }
                    }
                }
            } else if !messages.is_empty() {
                let bodies: Vec<&str> = messages.iter().map(Message::body).collect();
                feedback.push_str(&format!(
                    "{}: {}\n",
                    kind.as_str().to_uppercase(),
                    bodies.join(", ")
                ));
            }
        }
        if !feedback.is_empty() {
            self.resources.set_feedback(feedback.trim_end());
        }
        Ok(())
    }

    async fn finish(&mut self) -> ManagerResult<Task> {
        let store = self.context.store();
        match store.update_task(&self.task).await {
            Ok(stored) => self.task = stored,
            Err(TaskContextError::Board { source, .. }) => {
                warn!(task_id = %self.task.id(), error = %source, "task stored but board mirror is stale");
            }
            Err(err) => return Err(ManagerError::from(err)),
        }
        if let Some(path) = self.context.persist_path() {
            store.persist(path).await?;
        }
        info!(
            task_id = %self.task.id(),
            status = self.task.status().as_str(),
            "task manager finished"
        );
        Ok(self.task.clone())
    }
}
