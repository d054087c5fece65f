//! Behaviour tests for pipeline execution and issue escalation.

mod pipeline_steps;
mod test_helpers;

use pipeline_steps::world::{PipelineWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/pipeline_execution.feature",
    name = "Closing a pipeline forwards its subtask output"
)]
#[tokio::test(flavor = "multi_thread")]
async fn closing_pipeline_forwards_output(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_execution.feature",
    name = "Subtasks run once their inputs are available"
)]
#[tokio::test(flavor = "multi_thread")]
async fn subtasks_run_in_readiness_order(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_execution.feature",
    name = "A failing subtask blocks the pipeline"
)]
#[tokio::test(flavor = "multi_thread")]
async fn failing_subtask_blocks_pipeline(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_execution.feature",
    name = "Re-running the pipeline files the subtask issue as a task"
)]
#[tokio::test(flavor = "multi_thread")]
async fn rerun_files_issue_task(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_execution.feature",
    name = "A subtask waiting on a missing input leaves the pipeline blocked"
)]
#[tokio::test(flavor = "multi_thread")]
async fn starved_subtask_blocks_pipeline(world: PipelineWorld) {
    let _ = world;
}
