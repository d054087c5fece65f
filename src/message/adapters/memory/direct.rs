//! Per-task inbox for direct messages.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{destination_of, ensure_kind, poisoned};
use crate::message::{
    domain::{Message, MessageKind},
    error::MessagingResult,
    ports::MessagingUnit,
};
use crate::task::domain::{Task, TaskId};

/// Queues direct messages by destination task.
#[derive(Debug, Default)]
pub struct DirectInbox {
    queues: Mutex<BTreeMap<TaskId, Vec<Message>>>,
}

impl DirectInbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagingUnit for DirectInbox {
    fn kind(&self) -> MessageKind {
        MessageKind::Direct
    }

    async fn fetch(&self, task: &Task) -> MessagingResult<Vec<Message>> {
        let mut queues = self.queues.lock().map_err(poisoned)?;
        Ok(queues.remove(&task.id()).unwrap_or_default())
    }

    async fn fetch_all(&self) -> MessagingResult<Vec<Message>> {
        let mut queues = self.queues.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *queues).into_values().flatten().collect())
    }

    async fn submit(&self, message: Message) -> MessagingResult<()> {
        ensure_kind(MessageKind::Direct, &message)?;
        let destination = destination_of(MessageKind::Direct, &message)?;
        let mut queues = self.queues.lock().map_err(poisoned)?;
        queues.entry(destination).or_default().push(message);
        Ok(())
    }
}
