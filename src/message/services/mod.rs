//! Application services for message routing.

mod communicator;

pub use communicator::Communicator;
