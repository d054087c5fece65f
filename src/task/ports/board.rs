//! Port for mirroring tasks onto an external project board.

use crate::task::domain::{CardId, Task, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Serialisable reference identifying a board implementation and project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRef {
    /// Board implementation identifier used to pick a factory on reload.
    #[serde(rename = "type")]
    pub kind: String,
    /// Project identifier on the board.
    pub project_id: String,
}

impl BoardRef {
    /// Creates a board reference.
    #[must_use]
    pub fn new(kind: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            project_id: project_id.into(),
        }
    }
}

/// Card mirrored from a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Card identifier on the board.
    pub id: CardId,
    /// Task the card mirrors.
    pub task_id: TaskId,
    /// Card title.
    pub title: String,
    /// Markdown card body.
    pub description: String,
    /// Mirrored task status.
    pub status: TaskStatus,
}

/// Comment attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier on the board.
    pub id: String,
    /// Comment text.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.created_at.date_naive())
    }
}

/// Narrow add/update/delete/comment interface of a project board.
///
/// Cards are addressed through the task's card relation.
#[async_trait]
pub trait ProjectBoard: Send + Sync {
    /// Returns the reference persisted alongside the task snapshot.
    fn reference(&self) -> BoardRef;

    /// Creates a card for `task` and returns its identifier.
    async fn add_task(&self, task: &Task) -> BoardResult<CardId>;

    /// Refreshes the card of `task`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::MissingCard`] when the task has no card relation.
    async fn update_task(&self, task: &Task) -> BoardResult<()>;

    /// Removes the card of `task`.
    async fn delete_task(&self, task: &Task) -> BoardResult<()>;

    /// Returns the card with `id`, or `None` when absent.
    async fn get_card(&self, id: &CardId) -> BoardResult<Option<Card>>;

    /// Appends a comment to a card.
    async fn add_comment(&self, id: &CardId, text: &str) -> BoardResult<Comment>;

    /// Returns the comments of a card, oldest first.
    async fn get_comments(&self, id: &CardId) -> BoardResult<Vec<Comment>>;
}

/// Reopens boards from a persisted [`BoardRef`].
pub trait BoardFactory: Send + Sync {
    /// Opens the board identified by `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnsupportedBoard`] when the factory does not
    /// handle the reference's board type.
    fn open(&self, reference: &BoardRef) -> BoardResult<Arc<dyn ProjectBoard>>;
}

/// Errors returned by board implementations.
#[derive(Debug, Clone, Error)]
pub enum BoardError {
    /// The task has no card relation.
    #[error("task {0} has no board card")]
    MissingCard(TaskId),

    /// The card does not exist on the board.
    #[error("unknown board card: {0}")]
    UnknownCard(CardId),

    /// No board implementation handles the requested type.
    #[error("unsupported board type: {0}")]
    UnsupportedBoard(String),

    /// Board backend failure.
    #[error("board error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BoardError {
    /// Wraps a backend error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
