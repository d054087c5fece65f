//! Decomposing an objective and running the resulting project.

use std::sync::Arc;

use eyre::ensure;
use rstest::rstest;
use taskforge::executor::services::{DecompositionService, ProjectRunner};
use taskforge::task::domain::{AgentName, TaskStatus, TaskType};

use crate::test_helpers::{
    AGENT, ScriptedWorker, StaticDecomposer, new_store, unattended_context,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn decomposed_project_runs_to_completion() -> eyre::Result<()> {
    let store = new_store();
    let planner = DecompositionService::new(
        Arc::new(StaticDecomposer::new(&["research", "write"])),
        Arc::clone(&store),
    )
    .with_default_agent(AgentName::new(AGENT)?);

    let project = planner.decompose("publish a report", TaskType::Project).await?;
    let tasks = planner.expand_many(&project.children).await?;
    ensure!(tasks.len() == 2, "one task list per pipeline");
    ensure!(
        tasks.iter().all(|list| list.len() == 2),
        "each pipeline gets two tasks"
    );

    let worker = Arc::new(ScriptedWorker::new());
    let mut runner = ProjectRunner::new(unattended_context(&store, Arc::clone(&worker)));
    let executed = runner.run().await?;

    ensure!(executed.len() == 2, "both pipelines should run");
    ensure!(
        executed.iter().all(|pipeline| pipeline.status() == TaskStatus::Closed),
        "every pipeline should close"
    );
    ensure!(worker.calls().len() == 4, "every task should run once");
    let all = store.tasks().await?;
    ensure!(
        all.values()
            .filter(|task| task.task_type() == TaskType::Task)
            .all(|task| task.status() == TaskStatus::Closed
                && task.relations().root() == Some(project.parent.id())),
        "tasks should close and share the project root"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expanded_pipelines_chain_their_tasks() -> eyre::Result<()> {
    let store = new_store();
    let planner = DecompositionService::new(
        Arc::new(StaticDecomposer::new(&["first", "second", "third"])),
        Arc::clone(&store),
    );

    let breakdown = planner.decompose("pipeline", TaskType::Pipeline).await?;

    let [first, second, third] = breakdown.children.as_slice() else {
        eyre::bail!("three children expected");
    };
    ensure!(first.relations().prev().is_none(), "first has no predecessor");
    ensure!(first.relations().next() == Some(second.id()), "first -> second");
    ensure!(second.relations().prev() == Some(first.id()), "second <- first");
    ensure!(second.relations().next() == Some(third.id()), "second -> third");
    ensure!(third.relations().next().is_none(), "third has no successor");
    ensure!(
        breakdown.children.iter().all(|child| child.relations().agent().is_none()),
        "no default agent configured"
    );
    Ok(())
}
