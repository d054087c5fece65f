//! In-process messaging units.
//!
//! These back the non-interactive communicator used by tests and unattended
//! runs. Each unit drains on fetch, so a message is delivered at most once.

mod direct;
mod feedback;
mod queue;

pub use direct::DirectInbox;
pub use feedback::{CONSOLE_SOURCE, FeedbackInbox, FeedbackMode};
pub use queue::KindQueue;

use crate::message::{
    domain::{Message, MessageKind},
    error::{MessagingError, MessagingResult},
};
use crate::task::domain::TaskId;

fn ensure_kind(expected: MessageKind, message: &Message) -> MessagingResult<()> {
    let actual = message.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(MessagingError::KindMismatch { expected, actual })
    }
}

fn destination_of(kind: MessageKind, message: &Message) -> MessagingResult<TaskId> {
    message
        .header()
        .destination
        .ok_or(MessagingError::MissingDestination(kind))
}

fn poisoned(err: impl std::fmt::Display) -> MessagingError {
    MessagingError::persistence(std::io::Error::other(err.to_string()))
}
