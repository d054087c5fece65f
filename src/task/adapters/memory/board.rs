//! In-memory project board used for tests and local runs.

use async_trait::async_trait;
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{CardId, Task},
    ports::{
        BoardError, BoardFactory, BoardRef, BoardResult, Card, Comment, ProjectBoard,
    },
};

/// Board type recorded in snapshots for [`InMemoryProjectBoard`].
pub const MEMORY_BOARD_KIND: &str = "memory";

/// Thread-safe in-memory project board.
#[derive(Clone)]
pub struct InMemoryProjectBoard {
    project_id: String,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Arc<RwLock<BoardState>>,
}

#[derive(Debug, Default)]
struct BoardState {
    next_card: u64,
    next_comment: u64,
    cards: BTreeMap<CardId, Card>,
    comments: BTreeMap<CardId, Vec<Comment>>,
}

impl InMemoryProjectBoard {
    /// Creates an empty board for `project_id`.
    #[must_use]
    pub fn new(project_id: impl Into<String>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            project_id: project_id.into(),
            clock,
            state: Arc::new(RwLock::new(BoardState::default())),
        }
    }

    /// Returns every card currently on the board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Persistence`] when the state lock is poisoned.
    pub fn cards(&self) -> BoardResult<Vec<Card>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.cards.values().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryProjectBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProjectBoard")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

fn poisoned(err: impl std::fmt::Display) -> BoardError {
    BoardError::persistence(std::io::Error::other(err.to_string()))
}

fn card_for(id: CardId, task: &Task) -> Card {
    Card {
        id,
        task_id: task.id(),
        title: task.short_title(),
        description: task.description_card(),
        status: task.status(),
    }
}

#[async_trait]
impl ProjectBoard for InMemoryProjectBoard {
    fn reference(&self) -> BoardRef {
        BoardRef::new(MEMORY_BOARD_KIND, self.project_id.clone())
    }

    async fn add_task(&self, task: &Task) -> BoardResult<CardId> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.next_card += 1;
        let id = CardId::new(format!("card-{}", state.next_card)).map_err(BoardError::persistence)?;
        state.cards.insert(id.clone(), card_for(id.clone(), task));
        Ok(id)
    }

    async fn update_task(&self, task: &Task) -> BoardResult<()> {
        let id = task
            .relations()
            .card()
            .cloned()
            .ok_or(BoardError::MissingCard(task.id()))?;
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.cards.contains_key(&id) {
            return Err(BoardError::UnknownCard(id));
        }
        state.cards.insert(id.clone(), card_for(id, task));
        Ok(())
    }

    async fn delete_task(&self, task: &Task) -> BoardResult<()> {
        let id = task
            .relations()
            .card()
            .cloned()
            .ok_or(BoardError::MissingCard(task.id()))?;
        let mut state = self.state.write().map_err(poisoned)?;
        state.comments.remove(&id);
        state
            .cards
            .remove(&id)
            .map(|_| ())
            .ok_or(BoardError::UnknownCard(id))
    }

    async fn get_card(&self, id: &CardId) -> BoardResult<Option<Card>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.cards.get(id).cloned())
    }

    async fn add_comment(&self, id: &CardId, text: &str) -> BoardResult<Comment> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.cards.contains_key(id) {
            return Err(BoardError::UnknownCard(id.clone()));
        }
        state.next_comment += 1;
        let comment = Comment {
            id: format!("comment-{}", state.next_comment),
            text: text.to_owned(),
            created_at: self.clock.utc(),
        };
        state
            .comments
            .entry(id.clone())
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn get_comments(&self, id: &CardId) -> BoardResult<Vec<Comment>> {
        let state = self.state.read().map_err(poisoned)?;
        if !state.cards.contains_key(id) {
            return Err(BoardError::UnknownCard(id.clone()));
        }
        Ok(state.comments.get(id).cloned().unwrap_or_default())
    }
}

/// Opens fresh [`InMemoryProjectBoard`]s for `memory` board references.
#[derive(Clone)]
pub struct InMemoryBoardFactory {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl InMemoryBoardFactory {
    /// Creates a factory stamping comments with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { clock }
    }
}

impl BoardFactory for InMemoryBoardFactory {
    fn open(&self, reference: &BoardRef) -> BoardResult<Arc<dyn ProjectBoard>> {
        if reference.kind != MEMORY_BOARD_KIND {
            return Err(BoardError::UnsupportedBoard(reference.kind.clone()));
        }
        Ok(Arc::new(InMemoryProjectBoard::new(
            reference.project_id.clone(),
            Arc::clone(&self.clock),
        )))
    }
}
