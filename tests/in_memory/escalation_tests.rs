//! Issue escalation across the task hierarchy.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::ensure;
use rstest::rstest;
use taskforge::executor::{
    adapters::memory::InMemoryAgentRegistry,
    ports::{IssueHandler, IssueHandlerResult},
    services::{ExecutionContext, PipelinePhases, ProjectRunner, TaskManager},
};
use taskforge::message::{domain::Message, services::Communicator};
use taskforge::task::domain::{AgentName, Issue, IssueKind, TaskStatus, TaskType};

use crate::test_helpers::{
    AGENT, Script, ScriptedWorker, add_under, drain_issues, new_store, new_task, unattended_context,
};

/// Handler that never resolves anything.
struct RefusingHandler;

#[async_trait]
impl IssueHandler for RefusingHandler {
    async fn resolve(&self, _issue: &mut Issue) -> IssueHandlerResult<bool> {
        Ok(false)
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn issues_outside_the_subtree_pass_through_unchanged() -> eyre::Result<()> {
    let store = new_store();
    let project = new_task("project", TaskType::Project);
    store.add_task(&project).await?;
    let running = add_under(&store, &project, new_task("running", TaskType::Pipeline)).await;
    let other = add_under(&store, &project, new_task("other", TaskType::Pipeline)).await;
    let stranger = add_under(&store, &other, new_task("stranger", TaskType::Task)).await;
    let context = unattended_context(&store, Arc::new(ScriptedWorker::new()));
    let foreign = Issue::specify(IssueKind::Tool, "scraper offline", stranger.id());
    context
        .communicator()
        .submit_message(Message::issue(foreign.clone()))
        .await?;

    TaskManager::new(running, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    let queued = drain_issues(&context).await;
    ensure!(queued == [foreign], "foreign issue should be untouched: {queued:?}");
    ensure!(store.issue_tasks().await?.is_empty(), "nothing should be resolved");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unresolved_descendant_issue_is_reassigned_to_the_supervisor() -> eyre::Result<()> {
    let store = new_store();
    let pipeline = new_task("pipeline", TaskType::Pipeline);
    store.add_task(&pipeline).await?;
    let child = add_under(&store, &pipeline, new_task("child", TaskType::Task)).await;
    let agent = AgentName::new(AGENT)?;
    let registry = InMemoryAgentRegistry::new()
        .with_worker(agent.clone(), Arc::new(ScriptedWorker::new()))
        .with_default_agent(agent);
    let context = ExecutionContext::new(
        Arc::clone(&store),
        Arc::new(Communicator::non_interactive()),
        Arc::new(RefusingHandler),
        Arc::new(registry),
    );
    let raised = Issue::specify(IssueKind::Resource, "dataset missing", child.id());
    context
        .communicator()
        .submit_message(Message::issue(raised.clone()))
        .await?;

    TaskManager::new(pipeline.clone(), context.clone(), PipelinePhases::new())
        .run()
        .await?;

    let queued = drain_issues(&context).await;
    let reassigned = queued
        .iter()
        .find(|issue| issue.kind() == IssueKind::Resource)
        .ok_or_else(|| eyre::eyre!("resource issue should be escalated: {queued:?}"))?;
    ensure!(reassigned.task_id() == pipeline.id(), "issue should name the supervisor");
    ensure!(reassigned.description() == "dataset missing", "description kept");
    ensure!(reassigned.id() != raised.id(), "reassignment issues a new id");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn project_runner_files_backlog_issues_as_tasks() -> eyre::Result<()> {
    let store = new_store();
    let project = new_task("project", TaskType::Project);
    store.add_task(&project).await?;
    let pipeline = add_under(&store, &project, new_task("pipeline", TaskType::Pipeline)).await;
    let child = add_under(&store, &pipeline, new_task("child", TaskType::Task)).await;
    let worker = Arc::new(ScriptedWorker::new().on(
        "child",
        Script::Issue(IssueKind::Tool, "search capability offline".to_owned()),
    ));
    let context = unattended_context(&store, worker);

    let first = ProjectRunner::new(context.clone()).run().await?;
    ensure!(
        first.iter().map(|task| task.status()).collect::<Vec<_>>() == [TaskStatus::Blocked],
        "pipeline should end blocked"
    );

    ProjectRunner::new(context).run().await?;

    let parents: BTreeSet<_> = store
        .issue_tasks()
        .await?
        .iter()
        .filter_map(|task| task.relations().parent())
        .collect();
    ensure!(
        parents.contains(&child.id()) && parents.contains(&pipeline.id()),
        "issue tasks expected under the child and the pipeline, got {parents:?}"
    );
    Ok(())
}
