//! Error types for task domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task identifier is not a valid UUID.
    #[error("invalid task identifier: {0}")]
    InvalidTaskId(String),

    /// The agent name is empty after trimming.
    #[error("agent name must not be empty")]
    EmptyAgentName,

    /// The board card reference is empty after trimming.
    #[error("card reference must not be empty")]
    EmptyCardId,

    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,
}

/// Error returned while parsing enumerated domain values from their wire
/// representation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseDomainValueError {
    /// Name of the value family being parsed (for example `task status`).
    pub kind: &'static str,
    /// The rejected raw value.
    pub value: String,
}

impl ParseDomainValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
