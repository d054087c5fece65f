//! Application services for the task context.

mod context;
mod snapshot;

pub use context::{TaskContextError, TaskContextResult, TaskContextStore};
pub use snapshot::{ContextSnapshot, SnapshotError, SnapshotResult};
