//! Unit tests for the task module.
//!
//! Tests are organised by concept: domain values, the graph index, and the
//! context store facade with its board mirror and snapshots.
