//! Domain types for inter-task messaging.

mod message;

pub use message::{FeedbackPayload, Header, Message, MessageKind, Payload};
