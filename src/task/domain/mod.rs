//! Domain model for tasks, their relations and issues.
//!
//! Everything here is plain data plus validation. Storage, graph indexing and
//! board mirroring live outside the domain boundary.

mod error;
mod ids;
mod issue;
mod relations;
mod task;

pub use error::{ParseDomainValueError, TaskDomainError};
pub use ids::{AgentName, CardId, IssueId, TaskId};
pub use issue::{Issue, IssueKind, IssueReport, IssueStatus};
pub use relations::{RelationKind, TaskRelations};
pub use task::{Task, TaskResults, TaskStatus, TaskType};
