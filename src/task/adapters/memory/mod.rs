//! In-memory adapters for the task context.

mod board;
mod store;

pub use board::{InMemoryBoardFactory, InMemoryProjectBoard, MEMORY_BOARD_KIND};
pub use store::InMemoryTaskStore;
