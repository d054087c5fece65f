//! Engine configuration applied to execution contexts.

use std::collections::BTreeMap;
use std::sync::Arc;

use eyre::ensure;
use rstest::rstest;
use taskforge::config::{DEFAULT_AGENT_VAR, EngineConfig};
use taskforge::executor::{
    adapters::memory::InMemoryAgentRegistry,
    services::{ExecutionContext, SingleTaskPhases, TaskManager},
};
use taskforge::task::domain::{AgentName, TaskStatus, TaskType};

use crate::test_helpers::{AGENT, ScriptedWorker, new_store, new_task};

#[rstest]
#[case(None, AGENT)]
#[case(Some("researcher"), "researcher")]
#[tokio::test(flavor = "multi_thread")]
async fn default_agent_follows_the_environment(
    #[case] override_agent: Option<&str>,
    #[case] expected: &str,
) -> eyre::Result<()> {
    let env: BTreeMap<String, String> = override_agent
        .map(|agent| (DEFAULT_AGENT_VAR.to_owned(), agent.to_owned()))
        .into_iter()
        .collect();
    let config = EngineConfig::default().with_env(&env)?;
    let scripted = Arc::new(ScriptedWorker::new());
    let researcher = Arc::new(ScriptedWorker::new());
    let registry = InMemoryAgentRegistry::new()
        .with_worker(AgentName::new(AGENT)?, Arc::<ScriptedWorker>::clone(&scripted))
        .with_worker(AgentName::new("researcher")?, Arc::<ScriptedWorker>::clone(&researcher))
        .with_default_agent(AgentName::new(AGENT)?);
    let store = new_store();
    let task = new_task("survey", TaskType::Task).with_outputs(["answer"]);
    store.add_task(&task).await?;
    let context = ExecutionContext::non_interactive(Arc::clone(&store), Arc::new(registry))
        .with_config(&config);

    let finished = TaskManager::new(task, context, SingleTaskPhases::new())
        .run()
        .await?;

    ensure!(finished.status() == TaskStatus::Closed, "got {:?}", finished.status());
    ensure!(
        finished.relations().agent().map(AgentName::as_str) == Some(expected),
        "got {:?}",
        finished.relations().agent()
    );
    let (chosen, idle) = if expected == AGENT {
        (&scripted, &researcher)
    } else {
        (&researcher, &scripted)
    };
    ensure!(chosen.calls() == ["survey"], "got {:?}", chosen.calls());
    ensure!(idle.calls().is_empty(), "other worker should stay idle");
    Ok(())
}
