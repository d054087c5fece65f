//! Then steps for pipeline execution scenarios.

use super::world::{PipelineWorld, run_async};
use crate::test_helpers::drain_issues;
use rstest_bdd_macros::then;
use serde_json::json;
use taskforge::task::domain::TaskStatus;

fn expect_pipeline_status(world: &PipelineWorld, expected: TaskStatus) -> Result<(), eyre::Report> {
    let status = world.pipeline()?.status();
    if status != expected {
        return Err(eyre::eyre!(
            "expected pipeline {}, found {}",
            expected.as_str(),
            status.as_str()
        ));
    }
    Ok(())
}

#[then("the pipeline is closed")]
fn pipeline_closed(world: &PipelineWorld) -> Result<(), eyre::Report> {
    expect_pipeline_status(world, TaskStatus::Closed)
}

#[then("the pipeline is blocked")]
fn pipeline_blocked(world: &PipelineWorld) -> Result<(), eyre::Report> {
    expect_pipeline_status(world, TaskStatus::Blocked)
}

#[then(r#"the pipeline result "{key}" is "{value}""#)]
fn pipeline_result(world: &PipelineWorld, key: String, value: String) -> Result<(), eyre::Report> {
    let results = world
        .pipeline()?
        .results()
        .ok_or_else(|| eyre::eyre!("pipeline has no results"))?;
    if results.get(&key) != Some(&json!(value)) {
        return Err(eyre::eyre!("unexpected results {results:?}"));
    }
    Ok(())
}

#[then(r#"subtask "{name}" has status "{status}""#)]
fn subtask_status(world: &PipelineWorld, name: String, status: String) -> Result<(), eyre::Report> {
    let id = world.subtask(&name)?;
    let task = run_async(world.store.get_task(id))?
        .ok_or_else(|| eyre::eyre!("subtask {name} missing from the store"))?;
    let expected = TaskStatus::try_from(status.as_str())?;
    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected {name} {status}, found {}",
            task.status().as_str()
        ));
    }
    Ok(())
}

#[then(r#"subtask "{earlier}" ran before subtask "{later}""#)]
fn ran_in_order(world: &PipelineWorld, earlier: String, later: String) -> Result<(), eyre::Report> {
    let calls = world
        .worker
        .as_ref()
        .ok_or_else(|| eyre::eyre!("pipeline never executed"))?
        .calls();
    let position = |name: &str| {
        calls
            .iter()
            .position(|call| call == name)
            .ok_or_else(|| eyre::eyre!("{name} never ran: {calls:?}"))
    };
    if position(&earlier)? > position(&later)? {
        return Err(eyre::eyre!("{later} ran before {earlier}: {calls:?}"));
    }
    Ok(())
}

#[then(r#"an "{kind}" issue "{description}" was escalated"#)]
fn issue_escalated(
    world: &mut PipelineWorld,
    kind: String,
    description: String,
) -> Result<(), eyre::Report> {
    let context = world.context();
    let issues = run_async(drain_issues(&context));
    if !issues
        .iter()
        .any(|issue| issue.kind().as_str() == kind && issue.description() == description)
    {
        return Err(eyre::eyre!("no {kind} issue \"{description}\" in {issues:?}"));
    }
    Ok(())
}

#[then(r#"subtask "{name}" has an issue task beneath it"#)]
fn issue_task_beneath(world: &PipelineWorld, name: String) -> Result<(), eyre::Report> {
    let id = world.subtask(&name)?;
    let issue_tasks = run_async(world.store.issue_tasks())?;
    if !issue_tasks
        .iter()
        .any(|task| task.relations().parent() == Some(id))
    {
        return Err(eyre::eyre!("no issue task under {name}: {issue_tasks:?}"));
    }
    Ok(())
}
