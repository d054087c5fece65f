//! Resource pool, output mapping and worker input tests.

use crate::executor::domain::{FEEDBACK_KEY, ResourcePool, WorkerInput, map_outputs};
use crate::task::domain::{TaskResults, TaskType};
use eyre::ensure;
use rstest::rstest;
use serde_json::{Value, json};

use super::fixtures::task;

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[rstest]
#[case(&[], json!("ignored"), Some(TaskResults::new()))]
#[case(&["summary"], json!("done"), Some(TaskResults::from([("summary".to_owned(), json!("done"))])))]
#[case(&["summary"], json!({"nested": 1}), Some(TaskResults::from([("summary".to_owned(), json!({"nested": 1}))])))]
#[case(
    &["a", "b"],
    json!({"a": 1, "b": 2, "extra": 3}),
    Some(TaskResults::from([("a".to_owned(), json!(1)), ("b".to_owned(), json!(2))]))
)]
#[case(&["a", "b"], json!({"a": 1}), None)]
#[case(&["a", "b"], json!("flat"), None)]
fn maps_raw_output_onto_declared_keys(
    #[case] outputs: &[&str],
    #[case] raw: Value,
    #[case] expected: Option<TaskResults>,
) {
    assert_eq!(map_outputs(&keys(outputs), raw), expected);
}

#[rstest]
fn pool_satisfies_tasks_whose_inputs_are_present() -> eyre::Result<()> {
    let pool = ResourcePool::new().with("topic", json!("rust"));
    let ready = task("ready", TaskType::Task).with_inputs(["topic"]);
    let waiting = task("waiting", TaskType::Task).with_inputs(["topic", "outline"]);
    let free = task("free", TaskType::Task);

    ensure!(pool.satisfies(&ready), "topic is available");
    ensure!(!pool.satisfies(&waiting), "outline is missing");
    ensure!(pool.satisfies(&free), "a task without inputs is always ready");
    Ok(())
}

#[rstest]
fn merge_overwrites_existing_entries() {
    let mut pool = ResourcePool::new().with("draft", json!("v1"));
    pool.merge(&TaskResults::from([
        ("draft".to_owned(), json!("v2")),
        ("notes".to_owned(), json!(["a"])),
    ]));

    assert_eq!(pool.get("draft"), Some(&json!("v2")));
    assert_eq!(pool.len(), 2);
}

#[rstest]
fn feedback_is_appended_on_new_lines() -> eyre::Result<()> {
    let mut pool = ResourcePool::new();
    pool.append_feedback("first");
    pool.append_feedback("second");

    ensure!(pool.feedback() == Some("first\nsecond"), "got {:?}", pool.feedback());
    let stripped = pool.without_feedback();
    ensure!(!stripped.contains(FEEDBACK_KEY), "feedback should be removed");
    ensure!(pool.contains(FEEDBACK_KEY), "original keeps its feedback");
    Ok(())
}

#[rstest]
fn worker_input_selects_declared_inputs_only() -> eyre::Result<()> {
    let pool = ResourcePool::new()
        .with("topic", json!("rust"))
        .with("unrelated", json!("noise"));
    let subject = task("write", TaskType::Task).with_inputs(["topic"]);

    let input = WorkerInput::build(&subject, &pool)?;

    ensure!(input.task_id == subject.id(), "input should name the task");
    ensure!(input.resources.len() == 1, "only declared inputs are handed over");
    ensure!(input.remarks.is_none(), "no feedback was recorded");
    ensure!(
        input.prompt.contains(" - topic: rust"),
        "resource missing from prompt:\n{}",
        input.prompt
    );
    ensure!(!input.prompt.contains("noise"), "undeclared input leaked");
    ensure!(
        input.prompt.contains("OBJECTIVE: write objective"),
        "objective missing from prompt:\n{}",
        input.prompt
    );
    Ok(())
}

#[rstest]
fn worker_input_carries_feedback_as_remarks() -> eyre::Result<()> {
    let mut pool = ResourcePool::new();
    pool.set_feedback("USER FEEDBACK: be brief");
    let subject = task("write", TaskType::Task);

    let input = WorkerInput::build(&subject, &pool)?;

    ensure!(
        input.remarks.as_deref() == Some("USER FEEDBACK: be brief"),
        "remarks should carry the feedback"
    );
    ensure!(
        input.prompt.contains("REMARKS: USER FEEDBACK: be brief"),
        "remarks missing from prompt:\n{}",
        input.prompt
    );
    ensure!(!input.prompt.contains("RESOURCES:"), "no resources to list");
    Ok(())
}

#[rstest]
fn blank_feedback_is_not_a_remark() -> eyre::Result<()> {
    let mut pool = ResourcePool::new();
    pool.set_feedback("   ");

    let input = WorkerInput::build(&task("write", TaskType::Task), &pool)?;

    ensure!(input.remarks.is_none(), "blank feedback should be ignored");
    ensure!(!input.prompt.contains("REMARKS"), "no remarks section expected");
    Ok(())
}
