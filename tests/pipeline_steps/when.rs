//! When steps for pipeline execution scenarios.

use super::world::{PipelineWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use taskforge::executor::services::{PipelinePhases, TaskManager};

fn execute(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    let context = world.context();
    let pipeline = world.pipeline()?.clone();
    let finished = run_async(TaskManager::new(pipeline, context, PipelinePhases::new()).run())
        .wrap_err("run pipeline manager")?;
    world.pipeline = Some(finished);
    Ok(())
}

#[when("the pipeline is executed")]
fn pipeline_executed(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    execute(world)
}

#[when("the pipeline is executed again")]
fn pipeline_executed_again(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    execute(world)
}
