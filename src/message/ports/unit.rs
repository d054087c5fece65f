//! Transport port for a single message kind.

use crate::message::domain::{Message, MessageKind};
use crate::message::error::MessagingResult;
use crate::task::domain::Task;
use async_trait::async_trait;

/// Delivery channel for messages of one kind.
#[async_trait]
pub trait MessagingUnit: Send + Sync {
    /// Returns the kind of message this unit carries.
    fn kind(&self) -> MessageKind;

    /// Drains the messages addressed to `task`.
    ///
    /// Units without per-task addressing return an empty list.
    async fn fetch(&self, task: &Task) -> MessagingResult<Vec<Message>>;

    /// Drains every pending message.
    async fn fetch_all(&self) -> MessagingResult<Vec<Message>>;

    /// Enqueues `message`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::message::error::MessagingError::KindMismatch`] when
    /// the message kind differs from [`Self::kind`], and
    /// [`crate::message::error::MessagingError::MissingDestination`] when an
    /// addressed unit receives a message without a destination.
    async fn submit(&self, message: Message) -> MessagingResult<()>;
}
