//! Feedback channel for unattended runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{destination_of, ensure_kind, poisoned};
use crate::message::{
    domain::{Message, MessageKind},
    error::MessagingResult,
    ports::MessagingUnit,
};
use crate::task::domain::{Task, TaskId, TaskStatus};

/// Source recorded on synthesized feedback.
pub const CONSOLE_SOURCE: &str = "console";

/// What the inbox answers when no feedback is queued for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackMode {
    /// Reply with an empty approval, so every result passes review.
    #[default]
    AutoApprove,
    /// Reply with nothing and leave the decision to queued feedback.
    Manual,
}

/// Feedback unit with optional automatic approval.
#[derive(Debug, Default)]
pub struct FeedbackInbox {
    mode: FeedbackMode,
    queues: Mutex<BTreeMap<TaskId, Vec<Message>>>,
}

impl FeedbackInbox {
    /// Creates an inbox that approves every task it is asked about.
    #[must_use]
    pub fn auto_approve() -> Self {
        Self::default()
    }

    /// Creates an inbox that only returns queued feedback.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            mode: FeedbackMode::Manual,
            queues: Mutex::default(),
        }
    }

    /// Returns the reply mode.
    #[must_use]
    pub const fn mode(&self) -> FeedbackMode {
        self.mode
    }
}

#[async_trait]
impl MessagingUnit for FeedbackInbox {
    fn kind(&self) -> MessageKind {
        MessageKind::Feedback
    }

    async fn fetch(&self, task: &Task) -> MessagingResult<Vec<Message>> {
        let queued = {
            let mut queues = self.queues.lock().map_err(poisoned)?;
            queues.remove(&task.id()).unwrap_or_default()
        };
        if queued.is_empty() && self.mode == FeedbackMode::AutoApprove {
            return Ok(vec![Message::feedback(
                CONSOLE_SOURCE,
                task.id(),
                "",
                TaskStatus::Approved,
            )]);
        }
        Ok(queued)
    }

    async fn fetch_all(&self) -> MessagingResult<Vec<Message>> {
        let mut queues = self.queues.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *queues).into_values().flatten().collect())
    }

    async fn submit(&self, message: Message) -> MessagingResult<()> {
        ensure_kind(MessageKind::Feedback, &message)?;
        let destination = destination_of(MessageKind::Feedback, &message)?;
        let mut queues = self.queues.lock().map_err(poisoned)?;
        queues.entry(destination).or_default().push(message);
        Ok(())
    }
}
