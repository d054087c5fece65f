//! Port contracts for task storage and board mirroring.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod board;
pub mod store;

pub use board::{BoardError, BoardFactory, BoardRef, BoardResult, Card, Comment, ProjectBoard};
pub use store::{TaskStore, TaskStoreError, TaskStoreResult};
