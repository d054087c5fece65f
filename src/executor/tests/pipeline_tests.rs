//! Pipeline manager tests: readiness scheduling, result propagation and
//! blocked pipelines.

use crate::executor::{
    domain::RunOutput,
    ports::WorkerError,
    services::{PipelinePhases, TaskManager},
};
use crate::task::domain::{IssueKind, TaskResults, TaskStatus, TaskType};
use eyre::ensure;
use rstest::rstest;
use serde_json::json;

use super::fixtures::{MockAgent, context_with, drain_issues, store, stored_pipeline, task};

#[rstest]
#[case::no_outputs(&[], TaskResults::new())]
#[case::forwarded_output(&["x"], TaskResults::from([("x".to_owned(), json!("value"))]))]
#[tokio::test(flavor = "multi_thread")]
async fn pipeline_closes_child_and_collects_outputs(
    #[case] pipeline_outputs: &[&str],
    #[case] expected: TaskResults,
) -> eyre::Result<()> {
    let store = store();
    let (parent, children) = stored_pipeline(
        &store,
        task("parent", TaskType::Pipeline).with_outputs(pipeline_outputs.iter().copied()),
        vec![task("child", TaskType::Task).with_outputs(["x"])],
    )
    .await;
    let mut worker = MockAgent::new();
    worker
        .expect_run()
        .times(1)
        .returning(|_| Ok(RunOutput::Completed(json!("value"))));
    let context = context_with(&store, worker);

    let mut manager = TaskManager::new(parent, context, PipelinePhases::new());
    let finished = manager.run().await?;

    ensure!(finished.status() == TaskStatus::Closed, "got {:?}", finished.status());
    ensure!(finished.results() == Some(&expected), "got {:?}", finished.results());
    ensure!(
        manager.resources().get("x") == Some(&json!("value")),
        "child output should reach the pipeline pool"
    );
    let child = store
        .get_task(children.first().expect("one child").id())
        .await?
        .expect("child stored");
    ensure!(child.status() == TaskStatus::Closed, "got {:?}", child.status());
    ensure!(manager.phases().closed() == [child.id()], "child counted as closed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subtasks_run_in_data_readiness_order() -> eyre::Result<()> {
    let store = store();
    let consumer = task("consumer", TaskType::Task)
        .with_inputs(["outline"])
        .with_outputs(["draft"]);
    let producer = task("producer", TaskType::Task).with_outputs(["outline"]);
    let (parent, _) = stored_pipeline(
        &store,
        task("parent", TaskType::Pipeline).with_outputs(["draft"]),
        vec![consumer, producer],
    )
    .await;
    let mut worker = MockAgent::new();
    worker.expect_run().times(2).returning(|input| {
        let upstream = input
            .resources
            .get("outline")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("nothing");
        Ok(RunOutput::Completed(json!(format!(
            "{} after {upstream}",
            input.objective
        ))))
    });
    let context = context_with(&store, worker);

    let finished = TaskManager::new(parent, context, PipelinePhases::new())
        .run()
        .await?;

    ensure!(
        finished.results()
            == Some(&TaskResults::from([(
                "draft".to_owned(),
                json!("consumer objective after producer objective after nothing")
            )])),
        "consumer should see the producer's output, got {:?}",
        finished.results()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unsatisfiable_pipeline_is_blocked() -> eyre::Result<()> {
    let store = store();
    let (parent, children) = stored_pipeline(
        &store,
        task("parent", TaskType::Pipeline),
        vec![task("starved", TaskType::Task).with_inputs(["never"])],
    )
    .await;
    let context = context_with(&store, MockAgent::new());

    let finished = TaskManager::new(parent, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    ensure!(finished.status() == TaskStatus::Blocked, "got {:?}", finished.status());
    let issues = drain_issues(&context).await;
    ensure!(
        issues.iter().any(|issue| issue.kind() == IssueKind::Blocked
            && issue.description() == "unable to finish subtasks"
            && issue.task_id() == finished.id()),
        "blocked issue expected: {issues:?}"
    );
    let starved = store
        .get_task(children.first().expect("one child").id())
        .await?
        .expect("child stored");
    ensure!(starved.status() == TaskStatus::Open, "starved child never ran");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_child_blocks_pipeline_and_is_resolved_on_rerun() -> eyre::Result<()> {
    let store = store();
    let (parent, children) = stored_pipeline(
        &store,
        task("parent", TaskType::Pipeline),
        vec![task("child", TaskType::Task).with_outputs(["x"])],
    )
    .await;
    let child_id = children.first().expect("one child").id();
    let mut worker = MockAgent::new();
    worker
        .expect_run()
        .returning(|_| Err(WorkerError::failed("boom")));
    let context = context_with(&store, worker);

    let blocked = TaskManager::new(parent, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    ensure!(blocked.status() == TaskStatus::Blocked, "got {:?}", blocked.status());
    let child = store.get_task(child_id).await?.expect("child stored");
    ensure!(child.status() == TaskStatus::Issue, "got {:?}", child.status());
    ensure!(child.relations().issue().is_some(), "child links its issue");
    ensure!(store.issue_tasks().await?.is_empty(), "nothing resolved yet");

    TaskManager::new(blocked, context, PipelinePhases::new())
        .run()
        .await?;

    let follow_ups = store.issue_tasks().await?;
    ensure!(
        follow_ups.iter().any(|issue_task| {
            issue_task.task_type() == TaskType::Issue
                && issue_task.relations().parent() == Some(child_id)
                && issue_task.description().contains("boom")
        }),
        "issue task under the child expected: {follow_ups:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_children_are_not_rerun() -> eyre::Result<()> {
    let store = store();
    let (parent, children) = stored_pipeline(
        &store,
        task("parent", TaskType::Pipeline).with_outputs(["x"]),
        vec![task("child", TaskType::Task).with_outputs(["x"])],
    )
    .await;
    let mut worker = MockAgent::new();
    worker
        .expect_run()
        .times(1)
        .returning(|_| Ok(RunOutput::Completed(json!("once"))));
    let context = context_with(&store, worker);
    let first = TaskManager::new(parent, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    let mut rerun = TaskManager::new(first, context, PipelinePhases::new());
    let second = rerun.run().await?;

    ensure!(second.status() == TaskStatus::Closed, "got {:?}", second.status());
    ensure!(
        second.results() == Some(&TaskResults::from([("x".to_owned(), json!("once"))])),
        "closed child results should be reused"
    );
    ensure!(
        rerun.phases().closed() == [children.first().expect("one child").id()],
        "closed child should count without running"
    );
    Ok(())
}
