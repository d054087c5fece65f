//! Input payload handed to a worker.

use super::resources::ResourcePool;
use crate::task::domain::{Task, TaskId};
use minijinja::{Environment, context};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const WORKER_PROMPT: &str = "\
{% if resources %}For your task you have the following knowledge resources from previous work available.
RESOURCES:
{% for key, value in resources|items %} - {{ key }}: {{ value }}
{% endfor %}
{% endif %}OBJECTIVE: {{ objective }}
{% if remarks %}

REMARKS: {{ remarks }}{% endif %}";

/// Everything a worker receives for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerInput {
    /// Task being executed.
    pub task_id: TaskId,
    /// Task description.
    pub objective: String,
    /// Pool entries for the task's declared inputs.
    pub resources: BTreeMap<String, Value>,
    /// Accumulated feedback, when any.
    pub remarks: Option<String>,
    /// Rendered prompt combining the fields above.
    pub prompt: String,
}

impl WorkerInput {
    /// Builds the input for `task` from the shared pool.
    ///
    /// # Errors
    ///
    /// Returns the template error when rendering fails.
    pub fn build(task: &Task, pool: &ResourcePool) -> Result<Self, minijinja::Error> {
        let resources = pool.subset(task.inputs());
        let remarks = pool
            .feedback()
            .filter(|feedback| !feedback.trim().is_empty())
            .map(str::to_owned);
        let prompt = Environment::new().render_str(
            WORKER_PROMPT,
            context! {
                resources => &resources,
                objective => task.description(),
                remarks => &remarks,
            },
        )?;
        Ok(Self {
            task_id: task.id(),
            objective: task.description().to_owned(),
            resources,
            remarks,
            prompt,
        })
    }
}
