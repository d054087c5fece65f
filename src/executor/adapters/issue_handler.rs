//! Issue handler that files every issue as a follow-up task.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::executor::ports::{IssueHandler, IssueHandlerResult};
use crate::task::{
    domain::{Issue, Task, TaskStatus},
    services::TaskContextStore,
};

/// Creates an `ISSUE` task under the referenced task and marks that task
/// as having an issue. The resolved issue names the follow-up task as its
/// solution.
///
/// Resolution is idempotent: an issue whose follow-up task already exists
/// is reported as resolved without creating another task.
#[derive(Debug, Clone)]
pub struct SimpleIssueHandler {
    store: Arc<TaskContextStore>,
}

impl SimpleIssueHandler {
    /// Creates a handler writing through `store`.
    #[must_use]
    pub const fn new(store: Arc<TaskContextStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IssueHandler for SimpleIssueHandler {
    async fn resolve(&self, issue: &mut Issue) -> IssueHandlerResult<bool> {
        let Some(mut reference) = self.store.get_task(issue.task_id()).await? else {
            debug!(issue_id = %issue.id(), task_id = %issue.task_id(), "issue references an unknown task");
            return Ok(false);
        };
        let follow_up_id = issue.id().task_id();
        let solution = format!("filed as task {follow_up_id}");
        if self.store.task_exists(follow_up_id)? {
            issue.resolve(Some(solution));
            return Ok(true);
        }

        let clock = self.store.clock();
        let follow_up = Task::issue_task_for(issue, &reference, clock.as_ref());
        self.store.add_task(&follow_up).await?;
        reference.link_issue(issue, clock.as_ref());
        reference.set_status(TaskStatus::Issue, clock.as_ref());
        self.store.update_task(&reference).await?;
        issue.resolve(Some(solution));
        info!(
            issue_id = %issue.id(),
            task_id = %reference.id(),
            kind = issue.kind().as_str(),
            "issue filed as follow-up task"
        );
        Ok(true)
    }
}
