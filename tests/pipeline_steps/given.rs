//! Given steps for pipeline execution scenarios.

use super::world::{PipelineWorld, run_async};
use crate::test_helpers::{Script, add_under, new_task};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::json;
use taskforge::task::domain::{Task, TaskType};

fn store_pipeline(world: &mut PipelineWorld, pipeline: Task) -> Result<(), eyre::Report> {
    run_async(world.store.add_task(&pipeline)).wrap_err("store pipeline")?;
    world.pipeline = Some(pipeline);
    Ok(())
}

fn store_subtask(world: &mut PipelineWorld, subtask: Task) -> Result<(), eyre::Report> {
    let pipeline = world.pipeline()?.clone();
    let name = subtask.name().to_owned();
    let stored = run_async(add_under(&world.store, &pipeline, subtask));
    world.subtasks.insert(name, stored.id());
    Ok(())
}

#[given(r#"a pipeline declaring output "{output}""#)]
fn pipeline_with_output(world: &mut PipelineWorld, output: String) -> Result<(), eyre::Report> {
    store_pipeline(
        world,
        new_task("pipeline", TaskType::Pipeline).with_outputs([output]),
    )
}

#[given("a pipeline declaring no outputs")]
fn pipeline_without_outputs(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    store_pipeline(world, new_task("pipeline", TaskType::Pipeline))
}

#[given(r#"a subtask "{name}" producing "{output}" with value "{value}""#)]
fn producing_subtask(
    world: &mut PipelineWorld,
    name: String,
    output: String,
    value: String,
) -> Result<(), eyre::Report> {
    world
        .scripts
        .push((name.clone(), Script::Value(json!(value))));
    store_subtask(world, new_task(&name, TaskType::Task).with_outputs([output]))
}

#[given(r#"a subtask "{name}" requiring "{input}" and producing "{output}""#)]
fn consuming_subtask(
    world: &mut PipelineWorld,
    name: String,
    input: String,
    output: String,
) -> Result<(), eyre::Report> {
    store_subtask(
        world,
        new_task(&name, TaskType::Task)
            .with_inputs([input])
            .with_outputs([output]),
    )
}

#[given(r#"a subtask "{name}" failing with "{message}""#)]
fn failing_subtask(
    world: &mut PipelineWorld,
    name: String,
    message: String,
) -> Result<(), eyre::Report> {
    world.scripts.push((name.clone(), Script::Fail(message)));
    store_subtask(world, new_task(&name, TaskType::Task))
}
