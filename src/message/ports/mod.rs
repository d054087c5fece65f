//! Port contracts for message delivery.
//!
//! A messaging unit owns one message kind. The communicator routes by kind
//! and never inspects the transport behind a unit.

pub mod unit;

pub use unit::MessagingUnit;
