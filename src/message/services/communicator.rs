//! Kind-based router over registered messaging units.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::message::{
    adapters::memory::{DirectInbox, FeedbackInbox, KindQueue},
    domain::{Header, Message, MessageKind, Payload},
    error::{MessagingError, MessagingResult},
    ports::MessagingUnit,
};
use crate::task::domain::{Task, TaskId};

/// Routes messages to the unit registered for their kind.
///
/// At most one unit is registered per kind; registering another unit for the
/// same kind replaces the earlier one.
#[derive(Clone, Default)]
pub struct Communicator {
    units: BTreeMap<MessageKind, Arc<dyn MessagingUnit>>,
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("kinds", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Communicator {
    /// Creates a communicator with no units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the unattended communicator: direct inbox, auto-approving
    /// feedback and an issue queue.
    #[must_use]
    pub fn non_interactive() -> Self {
        Self::new()
            .with_unit(Arc::new(DirectInbox::new()))
            .with_unit(Arc::new(FeedbackInbox::auto_approve()))
            .with_unit(Arc::new(KindQueue::new(MessageKind::Issue)))
    }

    /// Registers `unit` under its kind.
    #[must_use]
    pub fn with_unit(mut self, unit: Arc<dyn MessagingUnit>) -> Self {
        self.register(unit);
        self
    }

    /// Registers `unit` under its kind, replacing any earlier unit.
    pub fn register(&mut self, unit: Arc<dyn MessagingUnit>) {
        self.units.insert(unit.kind(), unit);
    }

    /// Returns whether a unit handles `kind`.
    #[must_use]
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.units.contains_key(&kind)
    }

    /// Returns the registered kinds in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<MessageKind> {
        self.units.keys().copied().collect()
    }

    fn unit(&self, kind: MessageKind) -> MessagingResult<&Arc<dyn MessagingUnit>> {
        self.units
            .get(&kind)
            .ok_or(MessagingError::UnregisteredKind(kind))
    }

    /// Drains messages of `kind` addressed to `task`.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::UnregisteredKind`] when no unit handles
    /// `kind`, or the unit's own error.
    pub async fn fetch(&self, kind: MessageKind, task: &Task) -> MessagingResult<Vec<Message>> {
        self.unit(kind)?.fetch(task).await
    }

    /// Drains every pending message of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::UnregisteredKind`] when no unit handles
    /// `kind`, or the unit's own error.
    pub async fn fetch_all(&self, kind: MessageKind) -> MessagingResult<Vec<Message>> {
        self.unit(kind)?.fetch_all().await
    }

    /// Drains every registered unit for `task`, keyed by kind.
    ///
    /// # Errors
    ///
    /// Returns the first unit error encountered.
    pub async fn fetch_all_for_task(
        &self,
        task: &Task,
    ) -> MessagingResult<BTreeMap<MessageKind, Vec<Message>>> {
        let mut fetched = BTreeMap::new();
        for (kind, unit) in &self.units {
            fetched.insert(*kind, unit.fetch(task).await?);
        }
        Ok(fetched)
    }

    /// Builds an envelope and submits it to the unit for the payload's kind.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::UnregisteredKind`] when no unit handles the
    /// payload kind, or the unit's own error.
    pub async fn submit(
        &self,
        body: impl Into<String> + Send,
        payload: Payload,
        source: Option<TaskId>,
        destination: Option<TaskId>,
    ) -> MessagingResult<()> {
        let header = Header::new(source.map(|id| id.to_string()), destination);
        self.submit_message(Message::new(header, body, payload)).await
    }

    /// Submits a fully formed message.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::UnregisteredKind`] when no unit handles the
    /// message kind, or the unit's own error.
    pub async fn submit_message(&self, message: Message) -> MessagingResult<()> {
        let kind = message.kind();
        debug!(
            message_type = kind.as_str(),
            destination = ?message.header().destination,
            "submitting message"
        );
        self.unit(kind)?.submit(message).await
    }

    /// Routes an already-serialized envelope by its `message_type` field.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::UnknownKind`] for an unrecognised type,
    /// [`MessagingError::UnregisteredKind`] when no unit handles it and
    /// [`MessagingError::Malformed`] when the envelope does not decode.
    pub async fn submit_direct(&self, raw: Value) -> MessagingResult<()> {
        let type_name = raw
            .get("message_type")
            .and_then(Value::as_str)
            .ok_or_else(|| MessagingError::Malformed("missing message_type".to_owned()))?;
        let kind = MessageKind::try_from(type_name)
            .map_err(|_| MessagingError::UnknownKind(type_name.to_owned()))?;
        let unit = self.unit(kind)?;
        let message: Message =
            serde_json::from_value(raw).map_err(|err| MessagingError::Malformed(err.to_string()))?;
        unit.submit(message).await
    }
}
