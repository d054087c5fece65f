//! Core engine scenarios: pipeline success, child failure, sibling
//! splicing on delete and deep traversal.

use std::sync::Arc;

use eyre::ensure;
use rstest::rstest;
use serde_json::json;
use taskforge::executor::services::{PipelinePhases, TaskManager};
use taskforge::task::domain::{IssueKind, TaskResults, TaskStatus, TaskType};
use taskforge::task::services::TaskContextStore;

use crate::test_helpers::{
    Script, ScriptedWorker, add_under, drain_issues, new_store, new_task, unattended_context,
};

#[rstest]
#[case::no_outputs(&[], TaskResults::new())]
#[case::forwarded(&["x"], TaskResults::from([("x".to_owned(), json!("value"))]))]
#[tokio::test(flavor = "multi_thread")]
async fn pipeline_closes_child_and_returns_declared_outputs(
    #[case] parent_outputs: &[&str],
    #[case] expected: TaskResults,
) -> eyre::Result<()> {
    let store = new_store();
    let parent = new_task("parent", TaskType::Pipeline).with_outputs(parent_outputs.iter().copied());
    store.add_task(&parent).await?;
    let child = add_under(
        &store,
        &parent,
        new_task("child", TaskType::Task).with_outputs(["x"]),
    )
    .await;
    let worker = Arc::new(ScriptedWorker::new().on("child", Script::Value(json!("value"))));
    let context = unattended_context(&store, Arc::clone(&worker));

    let mut manager = TaskManager::new(parent, context, PipelinePhases::new());
    let finished = manager.run().await?;

    let stored_child = store.get_task(child.id()).await?.expect("child stored");
    ensure!(stored_child.status() == TaskStatus::Closed, "child should close");
    ensure!(
        manager.resources().get("x") == Some(&json!("value")),
        "child output should be pooled under x"
    );
    ensure!(finished.status() == TaskStatus::Closed, "pipeline should close");
    ensure!(finished.results() == Some(&expected), "got {:?}", finished.results());
    ensure!(worker.calls() == ["child"], "child should run once");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_child_is_escalated_and_resolved_by_the_parent() -> eyre::Result<()> {
    let store = new_store();
    let parent = new_task("parent", TaskType::Pipeline);
    store.add_task(&parent).await?;
    let child = add_under(&store, &parent, new_task("child", TaskType::Task)).await;
    let worker = Arc::new(
        ScriptedWorker::new().on("child", Script::Fail("boom".to_owned())),
    );
    let context = unattended_context(&store, worker);

    let first = TaskManager::new(parent, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    let failed = store.get_task(child.id()).await?.expect("child stored");
    ensure!(failed.status() == TaskStatus::Issue, "got {:?}", failed.status());
    ensure!(first.status() == TaskStatus::Blocked, "got {:?}", first.status());

    TaskManager::new(first, context.clone(), PipelinePhases::new())
        .run()
        .await?;

    let follow_ups = store.issue_tasks().await?;
    let follow_up = follow_ups
        .iter()
        .find(|task| task.relations().parent() == Some(child.id()))
        .ok_or_else(|| eyre::eyre!("no issue task under the child: {follow_ups:?}"))?;
    ensure!(follow_up.task_type() == TaskType::Issue, "issue task type expected");
    ensure!(
        follow_up.name() == "[ISSUE]: execution_error in task child",
        "got {}",
        follow_up.name()
    );
    ensure!(
        follow_up.description().ends_with(": boom"),
        "got {}",
        follow_up.description()
    );
    let escalated = drain_issues(&context).await;
    ensure!(
        escalated
            .iter()
            .all(|issue| issue.kind() == IssueKind::Exec || issue.kind() == IssueKind::Blocked),
        "only execution and blocked issues expected: {escalated:?}"
    );
    Ok(())
}

async fn chain(store: &TaskContextStore) -> eyre::Result<Vec<taskforge::task::domain::Task>> {
    let parent = new_task("parent", TaskType::Pipeline);
    store.add_task(&parent).await?;
    let names = ["a", "m", "b"];
    let mut linked = Vec::new();
    for name in names {
        linked.push(add_under(store, &parent, new_task(name, TaskType::Task)).await);
    }
    let ids: Vec<_> = linked.iter().map(taskforge::task::domain::Task::id).collect();
    let clock = store.clock();
    for (position, task) in linked.iter_mut().enumerate() {
        let prev = position.checked_sub(1).and_then(|index| ids.get(index).copied());
        let next = ids.get(position + 1).copied();
        task.update_relations(clock.as_ref(), |relations| {
            relations.set_prev(prev);
            relations.set_next(next);
        });
        *task = store.update_task(task).await?;
    }
    Ok(linked)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_middle_sibling_splices_its_neighbours() -> eyre::Result<()> {
    let store = new_store();
    let linked = chain(&store).await?;
    let [first, middle, last] = linked.as_slice() else {
        eyre::bail!("three siblings expected");
    };

    store.delete_task(middle.id(), true).await?;

    let before = store.get_task(first.id()).await?.expect("first kept");
    let after = store.get_task(last.id()).await?.expect("last kept");
    ensure!(before.relations().next() == Some(last.id()), "first should point to last");
    ensure!(after.relations().prev() == Some(first.id()), "last should point to first");
    ensure!(!store.task_exists(middle.id())?, "middle should be gone");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn descendants_cover_every_depth() -> eyre::Result<()> {
    let store = new_store();
    let root = new_task("root", TaskType::Project);
    store.add_task(&root).await?;
    let mid = add_under(&store, &root, new_task("mid", TaskType::Pipeline)).await;
    let leaf = add_under(&store, &mid, new_task("leaf", TaskType::Task)).await;

    let descendants = store.descendants_of(root.id())?;

    ensure!(
        descendants == [mid.id(), leaf.id()],
        "got {descendants:?}"
    );
    Ok(())
}
