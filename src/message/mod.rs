//! Message routing between task managers and the outside world.
//!
//! The module follows the same hexagonal layout as [`crate::task`]:
//!
//! - **Domain**: the [`domain::Message`] envelope and its typed payloads
//! - **Ports**: [`ports::MessagingUnit`], one delivery channel per kind
//! - **Adapters**: in-process units for unattended runs
//! - **Services**: [`services::Communicator`], which routes by kind
//!
//! # Example
//!
//! ```
//! use taskforge::message::{domain::MessageKind, services::Communicator};
//!
//! let communicator = Communicator::non_interactive();
//! assert!(communicator.handles(MessageKind::Feedback));
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
