//! Task entity, graph index and context store.
//!
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The structural index in [`graph`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The context store facade and snapshots in [`services`]

pub mod adapters;
pub mod domain;
pub mod graph;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
