//! Unaddressed queue for a single message kind.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ensure_kind, poisoned};
use crate::message::{
    domain::{Message, MessageKind},
    error::MessagingResult,
    ports::MessagingUnit,
};
use crate::task::domain::Task;

/// First-in first-out queue of one message kind.
///
/// Messages are not addressed, so [`MessagingUnit::fetch`] always returns an
/// empty list and consumers drain the queue with
/// [`MessagingUnit::fetch_all`]. The issue channel uses this unit.
#[derive(Debug)]
pub struct KindQueue {
    kind: MessageKind,
    queue: Mutex<Vec<Message>>,
}

impl KindQueue {
    /// Creates an empty queue for `kind`.
    #[must_use]
    pub const fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Number of pending messages.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the queue lock is poisoned.
    pub fn pending(&self) -> MessagingResult<usize> {
        Ok(self.queue.lock().map_err(poisoned)?.len())
    }
}

#[async_trait]
impl MessagingUnit for KindQueue {
    fn kind(&self) -> MessageKind {
        self.kind
    }

    async fn fetch(&self, _task: &Task) -> MessagingResult<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn fetch_all(&self) -> MessagingResult<Vec<Message>> {
        let mut queue = self.queue.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *queue))
    }

    async fn submit(&self, message: Message) -> MessagingResult<()> {
        ensure_kind(self.kind, &message)?;
        self.queue.lock().map_err(poisoned)?.push(message);
        Ok(())
    }
}
