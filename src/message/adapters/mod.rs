//! Adapter implementations of the messaging ports.

pub mod memory;
