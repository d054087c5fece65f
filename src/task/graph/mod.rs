//! In-memory structural index over task identifiers.
//!
//! The graph never holds task content. It records which tasks exist (in
//! insertion order), which are roots, the ordered child list of every task
//! and which task each issue refers to. Content lives in the task store.

mod tree;

use crate::task::domain::{IssueId, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Errors raised by structural graph operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskGraphError {
    /// The task is not registered in the graph.
    #[error("task {0} is not registered in the task graph")]
    UnknownTask(TaskId),

    /// The task is already registered in the graph.
    #[error("task {0} is already registered in the task graph")]
    DuplicateTask(TaskId),

    /// The task carries no issue relation.
    #[error("task {0} has no issue relation")]
    MissingIssueLink(TaskId),

    /// Traversal reached the same task twice.
    #[error("task graph is corrupt: task {0} is reachable more than once")]
    Cycle(TaskId),
}

/// Result type for graph operations.
pub type TaskGraphResult<T> = Result<T, TaskGraphError>;

/// Outcome of removing a task from the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTask {
    /// Former parent of the removed task, if it was not a root.
    pub parent: Option<TaskId>,
    /// Children that were moved to the former parent (or promoted to roots).
    pub children: Vec<TaskId>,
}

/// Tree-structured index over task identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GraphRecord")]
pub struct TaskGraph {
    all_tasks: BTreeMap<u64, TaskId>,
    root_tasks: BTreeMap<u64, TaskId>,
    id_to_children: BTreeMap<TaskId, Vec<TaskId>>,
    issue_to_id: BTreeMap<IssueId, TaskId>,
    next_index: u64,
}

#[derive(Deserialize)]
struct GraphRecord {
    #[serde(default)]
    all_tasks: BTreeMap<u64, TaskId>,
    #[serde(default)]
    root_tasks: BTreeMap<u64, TaskId>,
    #[serde(default)]
    id_to_children: BTreeMap<TaskId, Vec<TaskId>>,
    #[serde(default)]
    issue_to_id: BTreeMap<IssueId, TaskId>,
    #[serde(default)]
    next_index: Option<u64>,
}

impl From<GraphRecord> for TaskGraph {
    fn from(record: GraphRecord) -> Self {
        let floor = record
            .all_tasks
            .keys()
            .next_back()
            .map_or(0, |last| last.saturating_add(1));
        Self {
            next_index: record.next_index.map_or(floor, |index| index.max(floor)),
            all_tasks: record.all_tasks,
            root_tasks: record.root_tasks,
            id_to_children: record.id_to_children,
            issue_to_id: record.issue_to_id,
        }
    }
}

impl TaskGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.all_tasks.len()
    }

    /// Returns `true` when no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_tasks.is_empty()
    }

    /// Returns `true` when `id` is registered.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.index_of(id).is_some()
    }

    /// Positional index → task id for every registered task.
    #[must_use]
    pub const fn all_tasks(&self) -> &BTreeMap<u64, TaskId> {
        &self.all_tasks
    }

    /// Positional index → task id for root tasks.
    #[must_use]
    pub const fn root_tasks(&self) -> &BTreeMap<u64, TaskId> {
        &self.root_tasks
    }

    /// Parent id → ordered child ids.
    #[must_use]
    pub const fn id_to_children(&self) -> &BTreeMap<TaskId, Vec<TaskId>> {
        &self.id_to_children
    }

    /// Issue id → id of the task the issue concerns.
    #[must_use]
    pub const fn issue_to_id(&self) -> &BTreeMap<IssueId, TaskId> {
        &self.issue_to_id
    }

    /// Root task ids in insertion order.
    #[must_use]
    pub fn root_ids(&self) -> Vec<TaskId> {
        self.root_tasks.values().copied().collect()
    }

    /// Every registered task id in insertion order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.all_tasks.values().copied().collect()
    }

    /// Returns the task registered for `issue`, if any.
    #[must_use]
    pub fn task_for_issue(&self, issue: IssueId) -> Option<TaskId> {
        self.issue_to_id.get(&issue).copied()
    }

    /// Inserts a task, taking its parent from `parent` or, when absent, from
    /// the task's own parent relation. Tasks without a parent become roots.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::DuplicateTask`] when the task is already
    /// registered, or [`TaskGraphError::UnknownTask`] when one of `children`
    /// is not registered.
    pub fn insert(
        &mut self,
        task: &Task,
        parent: Option<TaskId>,
        children: &[TaskId],
    ) -> TaskGraphResult<()> {
        let resolved = parent.or_else(|| task.relations().parent());
        self.insert_under_parent(task.id(), resolved, children)
    }

    /// Appends `task` to the child list of `parent`, or registers it as a
    /// root when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::DuplicateTask`] when the task is already
    /// registered, or [`TaskGraphError::UnknownTask`] when one of `children`
    /// is not registered.
    pub fn insert_under_parent(
        &mut self,
        task: TaskId,
        parent: Option<TaskId>,
        children: &[TaskId],
    ) -> TaskGraphResult<()> {
        if self.contains(task) {
            return Err(TaskGraphError::DuplicateTask(task));
        }
        if let Some(unknown) = children.iter().find(|child| !self.contains(**child)) {
            return Err(TaskGraphError::UnknownTask(*unknown));
        }

        let index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);
        self.all_tasks.insert(index, task);
        match parent {
            None => {
                self.root_tasks.insert(index, task);
            }
            Some(parent_id) => {
                let siblings = self.id_to_children.entry(parent_id).or_default();
                if !siblings.contains(&task) {
                    siblings.push(task);
                }
            }
        }

        let own = self.id_to_children.entry(task).or_default();
        for child in children {
            if !own.contains(child) {
                own.push(*child);
            }
        }
        Ok(())
    }

    /// Records that the issue linked from `task` concerns `task`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::MissingIssueLink`] when the task carries no
    /// issue relation.
    pub fn insert_under_issue(&mut self, task: &Task) -> TaskGraphResult<()> {
        let issue = task
            .relations()
            .issue()
            .ok_or(TaskGraphError::MissingIssueLink(task.id()))?;
        self.issue_to_id.insert(issue, task.id());
        Ok(())
    }

    /// Returns the immediate children of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::UnknownTask`] when `parent` has no child
    /// registry.
    pub fn get_children(&self, parent: TaskId) -> TaskGraphResult<&[TaskId]> {
        self.id_to_children
            .get(&parent)
            .map(Vec::as_slice)
            .ok_or(TaskGraphError::UnknownTask(parent))
    }

    /// Returns every descendant of `parent`, breadth first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::UnknownTask`] when `parent` is not indexed
    /// and [`TaskGraphError::Cycle`] when a task is reached twice.
    pub fn get_all_children(&self, parent: TaskId) -> TaskGraphResult<Vec<TaskId>> {
        let mut visited = BTreeSet::from([parent]);
        let mut descendants = Vec::new();
        let mut queue = VecDeque::from([parent]);
        while let Some(current) = queue.pop_front() {
            let children = match self.get_children(current) {
                Ok(children) => children,
                Err(err) if current == parent => return Err(err),
                Err(_) => continue,
            };
            for child in children {
                if !visited.insert(*child) {
                    return Err(TaskGraphError::Cycle(*child));
                }
                descendants.push(*child);
                queue.push_back(*child);
            }
        }
        Ok(descendants)
    }

    /// Returns the parent of `task`, or `None` for roots and unknown tasks.
    #[must_use]
    pub fn parent_of(&self, task: TaskId) -> Option<TaskId> {
        self.id_to_children
            .iter()
            .find(|(_, children)| children.contains(&task))
            .map(|(parent, _)| *parent)
    }

    /// Removes `task` from every index.
    ///
    /// Children of the removed task take its place in the former parent's
    /// child list, or become roots when the task was a root.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::UnknownTask`] when the task is not
    /// registered.
    pub fn delete_task(&mut self, task: TaskId) -> TaskGraphResult<DetachedTask> {
        let index = self
            .index_of(task)
            .ok_or(TaskGraphError::UnknownTask(task))?;
        let children = self.id_to_children.remove(&task).unwrap_or_default();
        let parent = self.parent_of(task);

        self.all_tasks.remove(&index);
        if self.root_tasks.remove(&index).is_some() {
            for child in &children {
                if let Some(child_index) = self.index_of(*child) {
                    self.root_tasks.insert(child_index, *child);
                }
            }
        }
        if let Some(parent_id) = parent
            && let Some(siblings) = self.id_to_children.get_mut(&parent_id)
            && let Some(position) = siblings.iter().position(|id| *id == task)
        {
            siblings.splice(position..=position, children.iter().copied());
        }
        self.issue_to_id.retain(|_, target| *target != task);

        Ok(DetachedTask { parent, children })
    }

    /// Renders the forest with raw task ids, marking `highlight`.
    #[must_use]
    pub fn formatted_tree_view(&self, highlight: Option<TaskId>) -> String {
        self.render_tree(highlight, |id| id.to_string())
    }

    /// Renders the forest using `label` for every node, marking `highlight`.
    #[must_use]
    pub fn render_tree(&self, highlight: Option<TaskId>, label: impl Fn(TaskId) -> String) -> String {
        tree::render(self, highlight, &label)
    }

    fn index_of(&self, task: TaskId) -> Option<u64> {
        self.all_tasks
            .iter()
            .find(|(_, id)| **id == task)
            .map(|(index, _)| *index)
    }
}
