//! Decomposition service: stores the breakdowns returned by the external
//! decomposer.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use mockable::Clock;
use tracing::info;

use super::error::{ManagerError, ManagerResult};
use crate::executor::ports::{Breakdown, Decomposer};
use crate::task::{
    domain::{AgentName, Task, TaskId, TaskType},
    services::TaskContextStore,
};

/// Wraps a [`Decomposer`] and files its output in the task context.
///
/// Children are linked to their parent and root and chained through their
/// previous and next relations in the order the decomposer returned them.
#[derive(Clone)]
pub struct DecompositionService {
    decomposer: Arc<dyn Decomposer>,
    store: Arc<TaskContextStore>,
    default_agent: Option<AgentName>,
}

impl fmt::Debug for DecompositionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompositionService")
            .field("default_agent", &self.default_agent)
            .finish_non_exhaustive()
    }
}

impl DecompositionService {
    /// Creates a service storing into `store`.
    #[must_use]
    pub fn new(decomposer: Arc<dyn Decomposer>, store: Arc<TaskContextStore>) -> Self {
        Self {
            decomposer,
            store,
            default_agent: None,
        }
    }

    /// Assigns `agent` to children that come back without one.
    #[must_use]
    pub fn with_default_agent(mut self, agent: AgentName) -> Self {
        self.default_agent = Some(agent);
        self
    }

    /// Breaks `objective` into a new parent of `parent_type` and stores it
    /// with its children.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotDecomposable`] for leaf types, the
    /// decomposer's error, or the context store's error.
    pub async fn decompose(&self, objective: &str, parent_type: TaskType) -> ManagerResult<Breakdown> {
        let breakdown = self.request(objective, parent_type).await?;
        self.store_breakdown(breakdown).await
    }

    /// Breaks an existing task down one level and stores the children under
    /// it.
    ///
    /// # Errors
    ///
    /// As for [`Self::decompose`]; the parent must already be indexed.
    pub async fn expand(&self, parent: &Task) -> ManagerResult<Vec<Task>> {
        let breakdown = self.request(parent.description(), parent.task_type()).await?;
        let stored = self
            .store_breakdown(Breakdown {
                parent: parent.clone(),
                children: breakdown.children,
            })
            .await?;
        Ok(stored.children)
    }

    /// Requests several breakdowns concurrently and stores them in input
    /// order once all have arrived.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing is stored when any request fails.
    pub async fn decompose_many(
        &self,
        objectives: &[&str],
        parent_type: TaskType,
    ) -> ManagerResult<Vec<Breakdown>> {
        let breakdowns = try_join_all(
            objectives
                .iter()
                .map(|objective| self.request(objective, parent_type)),
        )
        .await?;
        let mut stored = Vec::with_capacity(breakdowns.len());
        for breakdown in breakdowns {
            stored.push(self.store_breakdown(breakdown).await?);
        }
        Ok(stored)
    }

    /// Expands several existing tasks concurrently, storing children in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing is stored when any request fails.
    pub async fn expand_many(&self, parents: &[Task]) -> ManagerResult<Vec<Vec<Task>>> {
        let breakdowns = try_join_all(
            parents
                .iter()
                .map(|parent| self.request(parent.description(), parent.task_type())),
        )
        .await?;
        let mut stored = Vec::with_capacity(breakdowns.len());
        for (parent, breakdown) in parents.iter().zip(breakdowns) {
            let filed = self
                .store_breakdown(Breakdown {
                    parent: parent.clone(),
                    children: breakdown.children,
                })
                .await?;
            stored.push(filed.children);
        }
        Ok(stored)
    }

    async fn request(&self, objective: &str, parent_type: TaskType) -> ManagerResult<Breakdown> {
        if parent_type.child_type().is_none() {
            return Err(ManagerError::NotDecomposable(parent_type));
        }
        Ok(self.decomposer.breakdown(objective, parent_type).await?)
    }

    async fn store_breakdown(&self, breakdown: Breakdown) -> ManagerResult<Breakdown> {
        let Breakdown { parent, children } = breakdown;
        let clock = self.store.clock();
        let insert_parent = !self.store.task_exists(parent.id())?;
        let tail = if insert_parent {
            None
        } else {
            self.store.children_of(parent.id()).await?.pop()
        };
        let linked = link_children(
            &parent,
            children,
            tail.as_ref().map(Task::id),
            self.default_agent.as_ref(),
            clock.as_ref(),
        );
        self.store.add_tasks(&parent, &linked, insert_parent).await?;
        if let Some(mut last) = tail
            && let Some(first) = linked.first()
        {
            let first_id = first.id();
            last.update_relations(clock.as_ref(), |relations| relations.set_next(Some(first_id)));
            self.store.update_task(&last).await?;
        }
        info!(
            task_id = %parent.id(),
            children = linked.len(),
            "breakdown stored"
        );
        Ok(Breakdown {
            parent,
            children: linked,
        })
    }
}

/// Links `children` under `parent` in order, continuing the sibling chain
/// after `tail` when the parent already has children.
fn link_children(
    parent: &Task,
    children: Vec<Task>,
    tail: Option<TaskId>,
    default_agent: Option<&AgentName>,
    clock: &(impl Clock + ?Sized),
) -> Vec<Task> {
    let ids: Vec<TaskId> = children.iter().map(Task::id).collect();
    let parent_id = parent.id();
    let root = parent.relations().root().unwrap_or_else(|| parent.id());
    children
        .into_iter()
        .enumerate()
        .map(|(position, mut child)| {
            let prev = position
                .checked_sub(1)
                .map_or(tail, |previous| ids.get(previous).copied());
            let next = ids.get(position.saturating_add(1)).copied();
            let agent = child
                .relations()
                .agent()
                .or(default_agent)
                .cloned();
            child.update_relations(clock, |relations| {
                relations.set_parent(Some(parent_id));
                relations.set_root(Some(root));
                relations.set_prev(prev);
                relations.set_next(next);
                relations.set_agent(agent);
            });
            child
        })
        .collect()
}
