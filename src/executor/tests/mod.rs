//! Unit tests for the execution engine.
//!
//! Shared mocks and builders live in `fixtures`; the remaining modules
//! follow the manager roles.

mod domain_tests;
mod pipeline_tests;
