//! Phase outcomes of the task manager protocol.

use crate::task::domain::{IssueReport, TaskResults};
use serde_json::Value;

/// Responsibility of a manager within the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerRole {
    /// Executes a single task through a worker.
    Execution,
    /// Schedules and supervises subordinate tasks.
    Supervisor,
}

impl ManagerRole {
    /// Returns the log label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Supervisor => "supervisor",
        }
    }
}

/// Result of the startup phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// The task may proceed to the run phase.
    Ready,
    /// Startup failed; the report becomes the task's issue.
    Issue(IssueReport),
}

/// Result of the run phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// Raw output to be mapped onto the declared outputs.
    Completed(Value),
    /// The worker reported an issue instead of a result.
    Issue(IssueReport),
}

/// Result of the shutdown phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The results were accepted and the task may close.
    Accepted(TaskResults),
    /// The results were rejected; the text is appended to the feedback and
    /// the run phase repeats.
    Rejected(String),
}

/// Verdict of a result reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    /// The results are acceptable.
    Accept,
    /// The results must be reworked, with the reviewer's remarks.
    Reject(String),
}

/// Maps a raw run output onto the declared output keys.
///
/// A task without outputs yields an empty map and a single-output task wraps
/// the raw value under its key. A task with several outputs requires an
/// object carrying every declared key and keeps only those keys. Returns
/// `None` when that requirement is not met.
#[must_use]
pub fn map_outputs(outputs: &[String], raw: Value) -> Option<TaskResults> {
    match outputs {
        [] => Some(TaskResults::new()),
        [key] => Some(TaskResults::from([(key.clone(), raw)])),
        keys => {
            let Value::Object(mut object) = raw else {
                return None;
            };
            keys.iter()
                .map(|key| object.remove(key).map(|value| (key.clone(), value)))
                .collect()
        }
    }
}
