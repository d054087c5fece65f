//! Execution domain: resource pool, phase outcomes and worker input.

mod input;
mod outcome;
mod resources;

pub use input::WorkerInput;
pub use outcome::{ManagerRole, Review, RunOutput, ShutdownOutcome, StartupOutcome, map_outputs};
pub use resources::{FEEDBACK_KEY, ResourcePool};
