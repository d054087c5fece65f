//! Task entity, hierarchy type and lifecycle status.

use super::{Issue, ParseDomainValueError, TaskDomainError, TaskId, TaskRelations};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Results produced by a closed task, keyed by declared output name.
pub type TaskResults = BTreeMap<String, Value>;

/// Position of a task in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Top-level objective.
    Project,
    /// Sequenced group of tasks.
    Pipeline,
    /// Single unit of work.
    Task,
    /// Unit of work below a task.
    Subtask,
    /// Follow-up task resolving a reported issue.
    Issue,
}

impl TaskType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Pipeline => "pipeline",
            Self::Task => "task",
            Self::Subtask => "subtask",
            Self::Issue => "issue",
        }
    }

    /// Returns the type children of this type are created with.
    #[must_use]
    pub const fn child_type(self) -> Option<Self> {
        match self {
            Self::Project => Some(Self::Pipeline),
            Self::Pipeline => Some(Self::Task),
            Self::Task => Some(Self::Subtask),
            Self::Subtask | Self::Issue => None,
        }
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "project" => Ok(Self::Project),
            "pipeline" => Ok(Self::Pipeline),
            "task" => Ok(Self::Task),
            "subtask" => Ok(Self::Subtask),
            "issue" => Ok(Self::Issue),
            _ => Err(ParseDomainValueError::new("task type", value)),
        }
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, awaiting approval.
    #[default]
    Open,
    /// Work has started but is not yet approved or finished.
    InProgress,
    /// A pipeline could not finish all of its subtasks.
    Blocked,
    /// Finished successfully.
    Closed,
    /// Failed and escalated through a linked issue.
    Issue,
    /// Approved for execution.
    Approved,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Closed => "closed",
            Self::Issue => "issue",
            Self::Approved => "approved",
        }
    }

    /// Returns `true` for statuses a manager never leaves on its own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Issue | Self::Blocked)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "closed" => Ok(Self::Closed),
            "issue" => Ok(Self::Issue),
            "approved" => Ok(Self::Approved),
            _ => Err(ParseDomainValueError::new("task status", value)),
        }
    }
}

/// A unit of work with declared inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    name: String,
    description: String,
    #[serde(rename = "type")]
    task_type: TaskType,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    relations: TaskRelations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    results: Option<TaskResults>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        task_type: TaskType,
        clock: &(impl Clock + ?Sized),
    ) -> Result<Self, TaskDomainError> {
        let task_name = name.into();
        if task_name.trim().is_empty() {
            return Err(TaskDomainError::EmptyTaskName);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            name: task_name,
            description: description.into(),
            task_type,
            status: TaskStatus::Open,
            inputs: Vec::new(),
            outputs: Vec::new(),
            relations: TaskRelations::new(),
            summary: None,
            details: None,
            results: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Builds the follow-up task that resolves `issue` raised by `ref_task`.
    ///
    /// The new task reuses the issue identifier, is parented to the
    /// referenced task and inherits its root.
    #[must_use]
    pub fn issue_task_for(issue: &Issue, ref_task: &Self, clock: &(impl Clock + ?Sized)) -> Self {
        let timestamp = clock.utc();
        let mut relations = TaskRelations::new().with_parent(ref_task.id);
        relations.set_root(ref_task.relations.root().or(Some(ref_task.id)));
        relations.set_agent(ref_task.relations.agent().cloned());
        Self {
            id: issue.id().task_id(),
            name: format!("[ISSUE]: {} in task {}", issue.kind(), ref_task.name),
            description: issue.to_string(),
            task_type: TaskType::Issue,
            status: TaskStatus::Open,
            inputs: Vec::new(),
            outputs: Vec::new(),
            relations,
            summary: None,
            details: None,
            results: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Replaces the generated identifier.
    #[must_use]
    pub const fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Sets the declared input keys.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the declared output keys.
    #[must_use]
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the relation set.
    #[must_use]
    pub fn with_relations(mut self, relations: TaskRelations) -> Self {
        self.relations = relations;
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets free-form details.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the hierarchy type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the declared input keys.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Returns the declared output keys.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the relation set.
    #[must_use]
    pub const fn relations(&self) -> &TaskRelations {
        &self.relations
    }

    /// Returns the summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the details, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }

    /// Returns the results, if any.
    #[must_use]
    pub const fn results(&self) -> Option<&TaskResults> {
        self.results.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Changes the lifecycle status.
    pub fn set_status(&mut self, status: TaskStatus, clock: &(impl Clock + ?Sized)) {
        self.status = status;
        self.updated_at = clock.utc();
    }

    /// Records the results of a successful run.
    pub fn set_results(&mut self, results: TaskResults, clock: &(impl Clock + ?Sized)) {
        self.results = Some(results);
        self.updated_at = clock.utc();
    }

    /// Links the task to an issue.
    pub fn link_issue(&mut self, issue: &Issue, clock: &(impl Clock + ?Sized)) {
        self.relations.set_issue(Some(issue.id()));
        self.updated_at = clock.utc();
    }

    /// Applies `edit` to the relation set.
    pub fn update_relations(
        &mut self,
        clock: &(impl Clock + ?Sized),
        edit: impl FnOnce(&mut TaskRelations),
    ) {
        edit(&mut self.relations);
        self.updated_at = clock.utc();
    }

    /// Returns the declared inputs as a comma-separated list.
    #[must_use]
    pub fn inputs_str(&self) -> String {
        self.inputs.join(", ")
    }

    /// Returns the declared outputs as a comma-separated list.
    #[must_use]
    pub fn outputs_str(&self) -> String {
        self.outputs.join(", ")
    }

    /// One-line title with inputs and outputs.
    #[must_use]
    pub fn short_title(&self) -> String {
        format!(
            "{} - In:{} | Out:{}",
            self.name,
            self.inputs_str(),
            self.outputs_str()
        )
    }

    /// Returns the summary, or an indented synopsis when none is set.
    #[must_use]
    pub fn summary_text(&self, indent: usize) -> String {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        let pad = " ".repeat(indent);
        format!(
            "{pad}Task: {}\n{pad}Description: {}\n{pad}Inputs: [{}]\n{pad}Outputs: [{}]\n",
            self.name,
            self.description,
            self.inputs_str(),
            self.outputs_str()
        )
    }

    /// Markdown card describing the task, used by board mirrors.
    #[must_use]
    pub fn description_card(&self) -> String {
        let mut card = format!(
            "# Task: {}\n## Description: \n{}\n---\n",
            self.name, self.description
        );
        if let Some(summary) = &self.summary {
            card.push_str(&format!("## Summary: \n{summary}\n---\n"));
        }
        if let Some(details) = &self.details {
            card.push_str("## Details: \n");
            for (key, value) in details {
                push_nested(&mut card, key, value, 0);
            }
            card.push_str(&format!(
                "\n - Inputs: {}\n - Outputs: {}\n---\n",
                self.inputs_str(),
                self.outputs_str()
            ));
        }
        if let Some(results) = &self.results {
            let rendered = serde_json::to_string(results).unwrap_or_default();
            card.push_str(&format!("## Results: \n{rendered}\n---\n"));
        }
        card
    }
}

fn push_nested(out: &mut String, key: &str, value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            out.push_str(&format!("{pad}{key}:\n"));
            for (child_key, child) in map {
                push_nested(out, child_key, child, depth + 1);
            }
        }
        Value::Array(items) => {
            out.push_str(&format!("{pad}{key}:\n"));
            for item in items {
                push_nested(out, "-", item, depth + 1);
            }
        }
        Value::String(text) => out.push_str(&format!("{pad}{key}: {text}\n")),
        other => out.push_str(&format!("{pad}{key}: {other}\n")),
    }
}
