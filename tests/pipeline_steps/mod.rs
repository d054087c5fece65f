//! Step definitions for pipeline execution scenarios.

mod given;
mod then;
mod when;
pub mod world;
