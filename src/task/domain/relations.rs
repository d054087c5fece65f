//! Named relations linking a task to its neighbours, worker, board card and
//! issue.

use super::{AgentName, CardId, IssueId, ParseDomainValueError, TaskId};
use serde::{Deserialize, Serialize};

/// Kind of relation a task can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Top ancestor of the task's hierarchy.
    Root,
    /// Previous sibling in the parent's child chain.
    Previous,
    /// Next sibling in the parent's child chain.
    Next,
    /// Direct parent task.
    Parent,
    /// Card on the mirrored project board.
    Card,
    /// Worker assigned to the task.
    Agent,
    /// Linked issue and its resolving task.
    Issue,
}

impl RelationKind {
    /// All relation kinds in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Root,
        Self::Previous,
        Self::Next,
        Self::Parent,
        Self::Card,
        Self::Agent,
        Self::Issue,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Previous => "previous",
            Self::Next => "next",
            Self::Parent => "parent",
            Self::Card => "card",
            Self::Agent => "agent",
            Self::Issue => "issue",
        }
    }
}

impl TryFrom<&str> for RelationKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("relation kind", value))
    }
}

/// Relations of a task, one optional slot per [`RelationKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRelations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<TaskId>,
    #[serde(default, rename = "previous", skip_serializing_if = "Option::is_none")]
    prev: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<AgentName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    card: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issue: Option<IssueId>,
}

impl TaskRelations {
    /// Creates an empty relation set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root relation.
    #[must_use]
    pub const fn with_root(mut self, root: TaskId) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the parent relation.
    #[must_use]
    pub const fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the assigned agent.
    #[must_use]
    pub fn with_agent(mut self, agent: AgentName) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Returns the root task, if any.
    #[must_use]
    pub const fn root(&self) -> Option<TaskId> {
        self.root
    }

    /// Returns the parent task, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Returns the previous sibling, if any.
    #[must_use]
    pub const fn prev(&self) -> Option<TaskId> {
        self.prev
    }

    /// Returns the next sibling, if any.
    #[must_use]
    pub const fn next(&self) -> Option<TaskId> {
        self.next
    }

    /// Returns the assigned agent, if any.
    #[must_use]
    pub const fn agent(&self) -> Option<&AgentName> {
        self.agent.as_ref()
    }

    /// Returns the board card reference, if any.
    #[must_use]
    pub const fn card(&self) -> Option<&CardId> {
        self.card.as_ref()
    }

    /// Returns the linked issue, if any.
    #[must_use]
    pub const fn issue(&self) -> Option<IssueId> {
        self.issue
    }

    /// Replaces the root relation.
    pub const fn set_root(&mut self, root: Option<TaskId>) {
        self.root = root;
    }

    /// Replaces the parent relation.
    pub const fn set_parent(&mut self, parent: Option<TaskId>) {
        self.parent = parent;
    }

    /// Replaces the previous-sibling relation.
    pub const fn set_prev(&mut self, prev: Option<TaskId>) {
        self.prev = prev;
    }

    /// Replaces the next-sibling relation.
    pub const fn set_next(&mut self, next: Option<TaskId>) {
        self.next = next;
    }

    /// Replaces the assigned agent.
    pub fn set_agent(&mut self, agent: Option<AgentName>) {
        self.agent = agent;
    }

    /// Replaces the board card reference.
    pub fn set_card(&mut self, card: Option<CardId>) {
        self.card = card;
    }

    /// Replaces the linked issue.
    pub const fn set_issue(&mut self, issue: Option<IssueId>) {
        self.issue = issue;
    }

    /// Returns the textual value stored under `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: RelationKind) -> Option<String> {
        match kind {
            RelationKind::Root => self.root.map(|id| id.to_string()),
            RelationKind::Previous => self.prev.map(|id| id.to_string()),
            RelationKind::Next => self.next.map(|id| id.to_string()),
            RelationKind::Parent => self.parent.map(|id| id.to_string()),
            RelationKind::Card => self.card.as_ref().map(ToString::to_string),
            RelationKind::Agent => self.agent.as_ref().map(ToString::to_string),
            RelationKind::Issue => self.issue.map(|id| id.to_string()),
        }
    }

    /// Returns `true` when no relation is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
            && self.parent.is_none()
            && self.prev.is_none()
            && self.next.is_none()
            && self.agent.is_none()
            && self.card.is_none()
            && self.issue.is_none()
    }
}
