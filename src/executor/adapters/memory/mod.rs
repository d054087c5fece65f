//! In-memory execution adapters.

mod registry;

pub use registry::InMemoryAgentRegistry;
