//! Shared wiring for integration tests: scripted collaborators and an
//! unattended execution context over the in-memory adapters.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockable::DefaultClock;
use serde_json::{Value, json};
use taskforge::executor::{
    adapters::memory::InMemoryAgentRegistry,
    domain::{RunOutput, WorkerInput},
    ports::{Breakdown, Decomposer, Worker, WorkerError, WorkerResult},
    services::ExecutionContext,
};
use taskforge::message::domain::{MessageKind, Payload};
use taskforge::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{AgentName, Issue, IssueKind, IssueReport, Task, TaskRelations, TaskType},
    services::TaskContextStore,
};

/// Name the scripted worker is registered under.
pub const AGENT: &str = "scripted";

/// Reaction of the scripted worker to one objective.
#[derive(Debug, Clone)]
pub enum Script {
    /// Complete with the value.
    Value(Value),
    /// Fail with the message.
    Fail(String),
    /// Report an issue.
    Issue(IssueKind, String),
}

/// Worker answering by objective, recording every call.
///
/// Objectives without a script complete with `"done: <objective>"`.
#[derive(Debug, Default)]
pub struct ScriptedWorker {
    scripts: BTreeMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedWorker {
    /// Creates a worker with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the reaction to `objective`.
    #[must_use]
    pub fn on(mut self, objective: &str, script: Script) -> Self {
        self.scripts.insert(objective.to_owned(), script);
        self
    }

    /// Objectives run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log lock").clone()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    async fn run(&self, input: &WorkerInput) -> WorkerResult<RunOutput> {
        self.calls
            .lock()
            .expect("call log lock")
            .push(input.objective.clone());
        match self.scripts.get(&input.objective) {
            Some(Script::Value(value)) => Ok(RunOutput::Completed(value.clone())),
            Some(Script::Fail(message)) => Err(WorkerError::failed(message.clone())),
            Some(Script::Issue(kind, description)) => Ok(RunOutput::Issue(IssueReport::new(
                *kind,
                description.clone(),
            ))),
            None => Ok(RunOutput::Completed(json!(format!(
                "done: {}",
                input.objective
            )))),
        }
    }
}

/// Decomposer returning the same list of child names for every objective.
#[derive(Debug, Clone)]
pub struct StaticDecomposer {
    children: Vec<String>,
}

impl StaticDecomposer {
    /// Creates a decomposer producing `children` in order.
    #[must_use]
    pub fn new(children: &[&str]) -> Self {
        Self {
            children: children.iter().map(|name| (*name).to_owned()).collect(),
        }
    }
}

#[async_trait]
impl Decomposer for StaticDecomposer {
    async fn breakdown(&self, objective: &str, parent_type: TaskType) -> WorkerResult<Breakdown> {
        let child_type = parent_type
            .child_type()
            .ok_or_else(|| WorkerError::failed("leaf type"))?;
        Ok(Breakdown {
            parent: new_task(objective, parent_type),
            children: self
                .children
                .iter()
                .map(|name| new_task(name, child_type))
                .collect(),
        })
    }
}

/// Creates an empty context store.
#[must_use]
pub fn new_store() -> Arc<TaskContextStore> {
    Arc::new(TaskContextStore::new(
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(DefaultClock),
    ))
}

/// Unattended context whose default agent is `worker`.
#[must_use]
pub fn unattended_context(
    store: &Arc<TaskContextStore>,
    worker: Arc<ScriptedWorker>,
) -> ExecutionContext {
    let agent = AgentName::new(AGENT).expect("valid agent name");
    let registry = InMemoryAgentRegistry::new()
        .with_worker(agent.clone(), worker)
        .with_default_agent(agent);
    ExecutionContext::non_interactive(Arc::clone(store), Arc::new(registry))
}

/// Creates a task whose description, and so its objective, is its name.
#[must_use]
pub fn new_task(name: &str, task_type: TaskType) -> Task {
    Task::new(name, name, task_type, &DefaultClock).expect("valid task")
}

/// Stores `child` under `parent`, inheriting the parent's root.
pub async fn add_under(store: &TaskContextStore, parent: &Task, child: Task) -> Task {
    let root = parent.relations().root().unwrap_or_else(|| parent.id());
    let linked = child.with_relations(
        TaskRelations::new()
            .with_parent(parent.id())
            .with_root(root),
    );
    store
        .add_tasks(parent, std::slice::from_ref(&linked), false)
        .await
        .expect("child stored");
    linked
}

/// Drains the issue queue, returning the issue payloads.
pub async fn drain_issues(context: &ExecutionContext) -> Vec<Issue> {
    context
        .communicator()
        .fetch_all(MessageKind::Issue)
        .await
        .expect("issue queue drains")
        .into_iter()
        .filter_map(|message| match message.into_payload() {
            Payload::Issue(issue) => Some(issue),
            _ => None,
        })
        .collect()
}
