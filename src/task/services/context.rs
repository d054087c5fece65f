//! Task context store: the single mutation path over the task store, the
//! graph index and the optional board mirror.
//!
//! Every write operation validates first, then writes the store, then the
//! graph, then the board. Writers are serialised so callers never observe a
//! task that exists in the store but not in the graph. Board failures are
//! reported after the authoritative writes completed and leave the mirror
//! behind until the next update.

use super::snapshot::{ContextSnapshot, SnapshotError};
use crate::task::{
    domain::{Task, TaskId, TaskStatus, TaskType},
    graph::{TaskGraph, TaskGraphError},
    ports::{BoardError, BoardFactory, ProjectBoard, TaskStore, TaskStoreError},
};
use camino::Utf8Path;
use mockable::Clock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors returned by the task context store.
#[derive(Debug, Error)]
pub enum TaskContextError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    /// Graph operation failed.
    #[error(transparent)]
    Graph(#[from] TaskGraphError),

    /// Snapshot persistence failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task is already part of the context.
    #[error("task {0} is already part of the task context")]
    Duplicate(TaskId),

    /// More than one root exists where exactly one was expected.
    #[error("expected a single root task, found {0}")]
    MultipleRoots(usize),

    /// No root task exists.
    #[error("the task context has no root task")]
    NoRoot,

    /// Mirroring to the project board failed after store and graph writes.
    #[error("board mirror failed for {} task(s): {source}", .failed.len())]
    Board {
        /// Tasks whose board mirror is stale.
        failed: Vec<TaskId>,
        /// First board error encountered.
        source: BoardError,
    },

    /// In-process state could not be accessed.
    #[error("task context state unavailable: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskContextError {
    fn poisoned(err: &impl std::fmt::Display) -> Self {
        Self::Persistence(Arc::new(std::io::Error::other(err.to_string())))
    }
}

/// Result type for task context store operations.
pub type TaskContextResult<T> = Result<T, TaskContextError>;

/// Facade keeping the task store, graph index and board mirror consistent.
pub struct TaskContextStore {
    store: Arc<dyn TaskStore>,
    graph: RwLock<TaskGraph>,
    board: RwLock<Option<Arc<dyn ProjectBoard>>>,
    writes: Mutex<()>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for TaskContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContextStore")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl TaskContextStore {
    /// Creates an empty context over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            store,
            graph: RwLock::new(TaskGraph::new()),
            board: RwLock::new(None),
            writes: Mutex::new(()),
            clock,
        }
    }

    /// Mirrors subsequent writes to `board`.
    #[must_use]
    pub fn with_board(self, board: Arc<dyn ProjectBoard>) -> Self {
        Self {
            board: RwLock::new(Some(board)),
            ..self
        }
    }

    /// Attaches a board mirror, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the board slot is
    /// poisoned.
    pub fn attach_board(&self, board: Arc<dyn ProjectBoard>) -> TaskContextResult<()> {
        let mut slot = self
            .board
            .write()
            .map_err(|err| TaskContextError::poisoned(&err))?;
        *slot = Some(board);
        Ok(())
    }

    /// Returns the attached board, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the board slot is
    /// poisoned.
    pub fn board(&self) -> TaskContextResult<Option<Arc<dyn ProjectBoard>>> {
        let slot = self
            .board
            .read()
            .map_err(|err| TaskContextError::poisoned(&err))?;
        Ok(slot.clone())
    }

    /// Returns the clock used to stamp relation rewrites.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// Stores `children` under `parent`, storing `parent` first when
    /// `insert_parent` is set.
    ///
    /// The parent is indexed as a root or under its own parent relation, and
    /// children are appended to the parent's child list in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Duplicate`] when a task is already part of
    /// the context or repeated in the batch, [`TaskContextError::NotFound`]
    /// when `insert_parent` is unset and the parent is unknown, and
    /// [`TaskContextError::Board`] when mirroring failed for some tasks.
    pub async fn add_tasks(
        &self,
        parent: &Task,
        children: &[Task],
        insert_parent: bool,
    ) -> TaskContextResult<()> {
        let _writer = self.writes.lock().await;
        {
            let graph = self.read_graph()?;
            let mut batch = BTreeSet::new();
            if insert_parent {
                if graph.contains(parent.id()) {
                    return Err(TaskContextError::Duplicate(parent.id()));
                }
                batch.insert(parent.id());
            } else if !graph.contains(parent.id()) {
                return Err(TaskContextError::NotFound(parent.id()));
            }
            if let Some(clash) = children
                .iter()
                .find(|child| graph.contains(child.id()) || !batch.insert(child.id()))
            {
                return Err(TaskContextError::Duplicate(clash.id()));
            }
        }

        let written: Vec<&Task> = insert_parent
            .then_some(parent)
            .into_iter()
            .chain(children)
            .collect();
        for task in &written {
            self.store.put(task).await?;
        }
        {
            let mut graph = self.write_graph()?;
            if insert_parent {
                graph.insert(parent, None, &[])?;
            }
            for child in children {
                graph.insert_under_parent(child.id(), Some(parent.id()), &[])?;
            }
        }
        debug!(
            parent_id = %parent.id(),
            children = children.len(),
            "stored task batch"
        );
        self.mirror_new(&written).await
    }

    /// Stores and indexes a single task under its parent relation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Duplicate`] when the task is already part
    /// of the context and [`TaskContextError::Board`] when mirroring failed.
    pub async fn add_task(&self, task: &Task) -> TaskContextResult<()> {
        let _writer = self.writes.lock().await;
        if self.read_graph()?.contains(task.id()) {
            return Err(TaskContextError::Duplicate(task.id()));
        }
        self.store.put(task).await?;
        self.write_graph()?.insert(task, None, &[])?;
        self.mirror_new(&[task]).await
    }

    /// Re-persists the full state of an indexed task and returns the stored
    /// record.
    ///
    /// A task in `ISSUE` status, or `BLOCKED` with a linked issue, is also
    /// registered in the graph's issue index. A card reference already
    /// recorded for the task is preserved when the caller's copy lacks it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::NotFound`] when the task is not indexed,
    /// [`TaskContextError::Graph`] when an `ISSUE` task has no issue link
    /// (nothing is written) and [`TaskContextError::Board`] when mirroring
    /// failed.
    pub async fn update_task(&self, task: &Task) -> TaskContextResult<Task> {
        let _writer = self.writes.lock().await;
        if !self.read_graph()?.contains(task.id()) {
            return Err(TaskContextError::NotFound(task.id()));
        }

        let mut record = task.clone();
        if record.relations().card().is_none()
            && let Some(stored) = self.store.get(task.id()).await?
            && let Some(card) = stored.relations().card()
        {
            let mut relations = record.relations().clone();
            relations.set_card(Some(card.clone()));
            record = record.with_relations(relations);
        }

        let registers_issue = match record.status() {
            TaskStatus::Issue => true,
            TaskStatus::Blocked => record.relations().issue().is_some(),
            _ => false,
        };
        if registers_issue && record.relations().issue().is_none() {
            return Err(TaskGraphError::MissingIssueLink(record.id()).into());
        }

        self.store.put(&record).await?;
        if registers_issue {
            self.write_graph()?.insert_under_issue(&record)?;
        }

        let Some(board) = self.board()? else {
            return Ok(record);
        };
        if record.relations().card().is_none() {
            self.mirror_new(&[&record]).await?;
            return Ok(self.store.get(record.id()).await?.unwrap_or(record));
        }
        if let Err(source) = board.update_task(&record).await {
            warn!(task_id = %record.id(), error = %source, "board update failed");
            return Err(TaskContextError::Board {
                failed: vec![record.id()],
                source,
            });
        }
        Ok(record)
    }

    /// Returns the task with `id`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Store`] when the store fails.
    pub async fn get_task(&self, id: TaskId) -> TaskContextResult<Option<Task>> {
        Ok(self.store.get(id).await?)
    }

    /// Returns the tasks for `ids` in order, `None` for missing entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Store`] when the store fails.
    pub async fn get_tasks(&self, ids: &[TaskId]) -> TaskContextResult<Vec<Option<Task>>> {
        Ok(self.store.get_many(ids).await?)
    }

    /// Removes a task from the store, graph and board.
    ///
    /// Children move to the deleted task's parent (or become roots) and their
    /// parent relation is rewritten. The sibling chain is relinked so that
    /// the previous sibling leads to the first moved child and the last moved
    /// child leads to the next sibling; without children the two neighbours
    /// are linked directly. A missing task is an error only when `raise_error` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::NotFound`] for a missing task when
    /// `raise_error` is set, and [`TaskContextError::Board`] when the card
    /// could not be removed.
    pub async fn delete_task(&self, id: TaskId, raise_error: bool) -> TaskContextResult<()> {
        let _writer = self.writes.lock().await;
        let Some(task) = self.store.get(id).await? else {
            return if raise_error {
                Err(TaskContextError::NotFound(id))
            } else {
                Ok(())
            };
        };
        let (parent, children) = {
            let graph = self.read_graph()?;
            let children = graph.get_children(id)?.to_vec();
            (graph.parent_of(id), children)
        };

        // Moved children take the deleted task's slot in the sibling chain.
        let prev = task.relations().prev();
        let next = task.relations().next();
        let first = children.first().copied();
        let last = children.last().copied();
        if let Some(prev_id) = prev
            && let Some(mut neighbour) = self.store.get(prev_id).await?
        {
            let successor = first.or(next);
            neighbour.update_relations(&*self.clock, |relations| relations.set_next(successor));
            self.store.put(&neighbour).await?;
        }
        if let Some(next_id) = next
            && let Some(mut neighbour) = self.store.get(next_id).await?
        {
            let predecessor = last.or(prev);
            neighbour.update_relations(&*self.clock, |relations| relations.set_prev(predecessor));
            self.store.put(&neighbour).await?;
        }
        for child_id in &children {
            if let Some(mut child) = self.store.get(*child_id).await? {
                let is_first = first == Some(*child_id);
                let is_last = last == Some(*child_id);
                child.update_relations(&*self.clock, |relations| {
                    relations.set_parent(parent);
                    if relations.root() == Some(id) {
                        relations.set_root(None);
                    }
                    if is_first {
                        relations.set_prev(prev);
                    }
                    if is_last {
                        relations.set_next(next);
                    }
                });
                self.store.put(&child).await?;
            }
        }

        self.store.delete(id).await?;
        self.write_graph()?.delete_task(id)?;
        debug!(task_id = %id, moved_children = children.len(), "deleted task");

        if let Some(board) = self.board()?
            && task.relations().card().is_some()
            && let Err(source) = board.delete_task(&task).await
        {
            warn!(task_id = %id, error = %source, "board delete failed");
            return Err(TaskContextError::Board {
                failed: vec![id],
                source,
            });
        }
        Ok(())
    }

    /// Renders the task tree with task names, highlighting `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError`] when the store or graph is unavailable.
    pub async fn repr_current_context(&self, task_id: Option<TaskId>) -> TaskContextResult<String> {
        let tasks = self.store.get_all().await?;
        let graph = self.read_graph()?;
        Ok(graph.render_tree(task_id, |id| {
            tasks
                .get(&id)
                .map_or_else(|| id.to_string(), |task| task.name().to_owned())
        }))
    }

    /// Renders the task tree with raw task ids.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the graph is poisoned.
    pub fn repr_tree(&self) -> TaskContextResult<String> {
        Ok(self.read_graph()?.formatted_tree_view(None))
    }

    /// Returns the single root task id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::NoRoot`] for an empty context and
    /// [`TaskContextError::MultipleRoots`] when several roots exist.
    pub fn root_id(&self) -> TaskContextResult<TaskId> {
        match self.root_ids()?.as_slice() {
            [only] => Ok(*only),
            [] => Err(TaskContextError::NoRoot),
            many => Err(TaskContextError::MultipleRoots(many.len())),
        }
    }

    /// Returns every root task id in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the graph is poisoned.
    pub fn root_ids(&self) -> TaskContextResult<Vec<TaskId>> {
        Ok(self.read_graph()?.root_ids())
    }

    /// Returns every stored task keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Store`] when the store fails.
    pub async fn tasks(&self) -> TaskContextResult<BTreeMap<TaskId, Task>> {
        Ok(self.store.get_all().await?)
    }

    /// Returns `true` when the task is indexed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the graph is poisoned.
    pub fn task_exists(&self, id: TaskId) -> TaskContextResult<bool> {
        Ok(self.read_graph()?.contains(id))
    }

    /// Returns the immediate children of `id` in sibling order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Graph`] when `id` is not indexed.
    pub async fn children_of(&self, id: TaskId) -> TaskContextResult<Vec<Task>> {
        let ids = self.read_graph()?.get_children(id)?.to_vec();
        Ok(self.store.get_many(&ids).await?.into_iter().flatten().collect())
    }

    /// Returns the ids of every descendant of `id`, breadth first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Graph`] when `id` is not indexed or the
    /// graph contains a cycle.
    pub fn descendants_of(&self, id: TaskId) -> TaskContextResult<Vec<TaskId>> {
        Ok(self.read_graph()?.get_all_children(id)?)
    }

    /// Returns the parent of `id` according to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the graph is poisoned.
    pub fn parent_of(&self, id: TaskId) -> TaskContextResult<Option<TaskId>> {
        Ok(self.read_graph()?.parent_of(id))
    }

    /// Returns every issue-resolution task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Store`] when the store fails.
    pub async fn issue_tasks(&self) -> TaskContextResult<Vec<Task>> {
        Ok(self
            .store
            .get_all()
            .await?
            .into_values()
            .filter(|task| task.task_type() == TaskType::Issue)
            .collect())
    }

    /// Returns a copy of the graph index.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Persistence`] when the graph is poisoned.
    pub fn graph(&self) -> TaskContextResult<TaskGraph> {
        Ok(self.read_graph()?.clone())
    }

    /// Writes the store, graph and board reference to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Snapshot`] when the document cannot be
    /// written.
    pub async fn persist(&self, path: &Utf8Path) -> TaskContextResult<()> {
        let _writer = self.writes.lock().await;
        let snapshot = ContextSnapshot {
            task_store: self.store.get_all().await?,
            task_network: self.graph()?,
            project_board: self.board()?.map(|board| board.reference()),
        };
        snapshot.write(path)?;
        info!(path = %path, tasks = snapshot.task_store.len(), "persisted task context");
        Ok(())
    }

    /// Replaces the context with the snapshot at `path`.
    ///
    /// Returns `false` when no snapshot exists. A recorded board is reopened
    /// through `boards`; without a factory the board reference is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TaskContextError::Snapshot`] when the document cannot be
    /// read and [`TaskContextError::Board`] when the board cannot be
    /// reopened.
    pub async fn load_from_file(
        &self,
        path: &Utf8Path,
        boards: Option<&dyn BoardFactory>,
    ) -> TaskContextResult<bool> {
        let _writer = self.writes.lock().await;
        let Some(snapshot) = ContextSnapshot::read(path)? else {
            info!(path = %path, "no task context snapshot to load");
            return Ok(false);
        };

        let board = match (&snapshot.project_board, boards) {
            (Some(reference), Some(factory)) => {
                Some(factory.open(reference).map_err(|source| TaskContextError::Board {
                    failed: Vec::new(),
                    source,
                })?)
            }
            (Some(reference), None) => {
                warn!(board_type = %reference.kind, "snapshot board reference dropped");
                None
            }
            (None, _) => None,
        };

        let count = snapshot.task_store.len();
        self.store.load(snapshot.task_store).await?;
        *self.write_graph()? = snapshot.task_network;
        *self
            .board
            .write()
            .map_err(|err| TaskContextError::poisoned(&err))? = board;
        info!(path = %path, tasks = count, "loaded task context");
        Ok(true)
    }

    async fn mirror_new(&self, tasks: &[&Task]) -> TaskContextResult<()> {
        let Some(board) = self.board()? else {
            return Ok(());
        };
        let mut failed = Vec::new();
        let mut first_error = None;
        for task in tasks {
            match board.add_task(task).await {
                Ok(card) => {
                    let mut relations = task.relations().clone();
                    relations.set_card(Some(card));
                    let mirrored = (*task).clone().with_relations(relations);
                    self.store.put(&mirrored).await?;
                }
                Err(source) => {
                    warn!(task_id = %task.id(), error = %source, "board mirror failed");
                    failed.push(task.id());
                    first_error.get_or_insert(source);
                }
            }
        }
        first_error.map_or(Ok(()), |source| {
            Err(TaskContextError::Board { failed, source })
        })
    }

    fn read_graph(&self) -> TaskContextResult<RwLockReadGuard<'_, TaskGraph>> {
        self.graph
            .read()
            .map_err(|err| TaskContextError::poisoned(&err))
    }

    fn write_graph(&self) -> TaskContextResult<RwLockWriteGuard<'_, TaskGraph>> {
        self.graph
            .write()
            .map_err(|err| TaskContextError::poisoned(&err))
    }
}
