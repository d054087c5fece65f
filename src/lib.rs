//! Taskforge: hierarchical task execution engine.
//!
//! Work is modelled as a tree of tasks (project, pipelines, tasks,
//! subtasks) held in a task context store. Task managers drive each task
//! from approval through execution to a closed or issue state, pipelines
//! schedule their subtasks by data readiness, and failures travel up the
//! hierarchy as issues.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`task`]: Task model, graph index and the context store facade
//! - [`message`]: Message envelopes, messaging units and the communicator
//! - [`executor`]: Task managers, pipelines, project runner and
//!   decomposition
//! - [`config`]: Engine configuration
//! - [`telemetry`]: Tracing subscriber set-up

pub mod config;
pub mod executor;
pub mod message;
pub mod task;
pub mod telemetry;
