//! Adapter implementations of the execution ports.

pub mod issue_handler;
pub mod memory;

pub use issue_handler::SimpleIssueHandler;
