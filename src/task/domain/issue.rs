//! Issue records describing failures and blocking conditions.

use super::{IssueId, ParseDomainValueError, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of failure an issue reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The run phase of a task failed.
    #[serde(rename = "execution_error")]
    Exec,
    /// A worker capability failed.
    #[serde(rename = "tool_error")]
    Tool,
    /// A declared input or output resource is missing.
    #[serde(rename = "resource_issue")]
    Resource,
    /// The assigned worker is unsuited for the task.
    #[serde(rename = "competence_issue")]
    Competence,
    /// Unclassified failure.
    #[serde(rename = "undefined_issue")]
    Undefined,
    /// The task has not been approved for execution.
    #[serde(rename = "approval_issue")]
    Approval,
    /// A pipeline could not finish all of its subtasks.
    #[serde(rename = "blocked_issue")]
    Blocked,
}

impl IssueKind {
    /// All issue kinds.
    pub const ALL: [Self; 7] = [
        Self::Exec,
        Self::Tool,
        Self::Resource,
        Self::Competence,
        Self::Undefined,
        Self::Approval,
        Self::Blocked,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exec => "execution_error",
            Self::Tool => "tool_error",
            Self::Resource => "resource_issue",
            Self::Competence => "competence_issue",
            Self::Undefined => "undefined_issue",
            Self::Approval => "approval_issue",
            Self::Blocked => "blocked_issue",
        }
    }
}

impl TryFrom<&str> for IssueKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("issue kind", value))
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// The issue awaits resolution.
    #[default]
    Open,
    /// A resolving task has been created.
    Resolved,
}

/// Failure reported by a worker or phase before it is attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    description: String,
    #[serde(rename = "type")]
    kind: IssueKind,
}

impl IssueReport {
    /// Creates a new report.
    #[must_use]
    pub fn new(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind,
        }
    }

    /// Returns the failure description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> IssueKind {
        self.kind
    }
}

/// Structured failure record linked to the task it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    id: IssueId,
    description: String,
    #[serde(rename = "type")]
    kind: IssueKind,
    task_id: TaskId,
    #[serde(default)]
    status: IssueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
}

impl Issue {
    /// Creates an open issue about `task_id`.
    #[must_use]
    pub fn specify(kind: IssueKind, description: impl Into<String>, task_id: TaskId) -> Self {
        Self {
            id: IssueId::new(),
            description: description.into(),
            kind,
            task_id,
            status: IssueStatus::Open,
            solution: None,
        }
    }

    /// Returns a copy of this issue re-addressed to another task, keeping the
    /// original description and kind under a fresh identifier.
    #[must_use]
    pub fn reassigned_to(&self, task_id: TaskId) -> Self {
        Self::specify(self.kind, self.description.clone(), task_id)
    }

    /// Returns the issue identifier.
    #[must_use]
    pub const fn id(&self) -> IssueId {
        self.id
    }

    /// Returns the failure description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> IssueKind {
        self.kind
    }

    /// Returns the task this issue concerns.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the resolution state.
    #[must_use]
    pub const fn status(&self) -> IssueStatus {
        self.status
    }

    /// Returns the recorded solution, if any.
    #[must_use]
    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref()
    }

    /// Marks the issue resolved with an optional solution note.
    pub fn resolve(&mut self, solution: Option<String>) {
        self.status = IssueStatus::Resolved;
        self.solution = solution;
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issue with task {}: {}",
            self.kind, self.task_id, self.description
        )
    }
}
