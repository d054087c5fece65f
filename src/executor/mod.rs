//! Execution engine bounded context.
//!
//! A [`services::TaskManager`] carries one task through triage, approval,
//! execution and persistence. [`services::SingleTaskPhases`] runs a leaf
//! task on a worker; [`services::PipelinePhases`] schedules the subtasks of
//! a pipeline by data readiness. [`services::ProjectRunner`] runs the
//! pipelines under the project root.
//!
//! - **Domain**: resource pool, worker input and phase outcomes.
//! - **Ports**: workers, agent registry, issue handler, reviewer and
//!   decomposer.
//! - **Adapters**: in-memory registry and the default issue handler.
//! - **Services**: the managers, the project runner and decomposition.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
