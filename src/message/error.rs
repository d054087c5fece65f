//! Error types for message routing and delivery.

use super::domain::MessageKind;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by messaging units and the communicator.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    /// No unit is registered for the message kind.
    #[error("message type {0} is not registered")]
    UnregisteredKind(MessageKind),

    /// The message type string is not recognised.
    #[error("unknown message type: {0}")]
    UnknownKind(String),

    /// The unit requires an addressed message.
    #[error("{0} messages require a destination task")]
    MissingDestination(MessageKind),

    /// A message was submitted to a unit of another kind.
    #[error("{actual} message submitted to the {expected} unit")]
    KindMismatch {
        /// Kind handled by the unit.
        expected: MessageKind,
        /// Kind of the submitted message.
        actual: MessageKind,
    },

    /// The envelope could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Backend failure.
    #[error("messaging backend error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl MessagingError {
    /// Wraps a backend error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;
