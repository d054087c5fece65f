//! Message envelope exchanged between task managers.
//!
//! On the wire a message is `{header, body, message_type, payload}`. The
//! `message_type` string routes the message to a messaging unit and decides
//! how `payload` is decoded.

use crate::message::error::MessagingError;
use crate::task::domain::{Issue, ParseDomainValueError, TaskId, TaskStatus};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Routing kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// User or reviewer feedback, the only kind that can approve a task.
    Feedback,
    /// Escalated issue report.
    Issue,
    /// Free-form message addressed to a task.
    Direct,
}

impl MessageKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Issue => "issue",
            Self::Direct => "direct",
        }
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "feedback" => Ok(Self::Feedback),
            "issue" => Ok(Self::Issue),
            "direct" => Ok(Self::Direct),
            _ => Err(ParseDomainValueError::new("message type", value)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sender and recipient of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Sender: a task id, or a channel name such as `console`.
    #[serde(default)]
    pub source: Option<String>,
    /// Recipient task, when the message is addressed.
    #[serde(default)]
    pub destination: Option<TaskId>,
}

impl Header {
    /// Creates a header.
    #[must_use]
    pub const fn new(source: Option<String>, destination: Option<TaskId>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Creates a header sent by a task.
    #[must_use]
    pub fn from_task(source: TaskId, destination: Option<TaskId>) -> Self {
        Self::new(Some(source.to_string()), destination)
    }

    /// Parses the source as a task id, when it is one.
    #[must_use]
    pub fn source_task(&self) -> Option<TaskId> {
        self.source
            .as_deref()
            .and_then(|source| TaskId::parse(source).ok())
    }
}

/// Feedback carried by a [`MessageKind::Feedback`] message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    /// Feedback text, possibly empty.
    #[serde(default)]
    pub feedback: String,
    /// Status the feedback assigns to the task.
    pub status: TaskStatus,
}

/// Typed payload, one variant per message kind.
///
/// Serialises as the bare payload object; the kind travels separately as
/// `message_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Feedback and status for a task.
    Feedback(FeedbackPayload),
    /// An escalated issue.
    Issue(Issue),
    /// Free-form structured data.
    Direct(Map<String, Value>),
}

impl Payload {
    /// Returns the routing kind of the payload.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Feedback(_) => MessageKind::Feedback,
            Self::Issue(_) => MessageKind::Issue,
            Self::Direct(_) => MessageKind::Direct,
        }
    }
}

/// A message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireMessage")]
pub struct Message {
    header: Header,
    body: String,
    payload: Payload,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(header: Header, body: impl Into<String>, payload: Payload) -> Self {
        Self {
            header,
            body: body.into(),
            payload,
        }
    }

    /// Creates a feedback message addressed to `destination`.
    #[must_use]
    pub fn feedback(
        source: impl Into<String>,
        destination: TaskId,
        feedback: impl Into<String>,
        status: TaskStatus,
    ) -> Self {
        let text = feedback.into();
        let body = if text.is_empty() {
            "FEEDBACK: None".to_owned()
        } else {
            format!("FEEDBACK: {text}")
        };
        Self::new(
            Header::new(Some(source.into()), Some(destination)),
            body,
            Payload::Feedback(FeedbackPayload {
                feedback: text,
                status,
            }),
        )
    }

    /// Creates an issue message sent by the task the issue concerns.
    #[must_use]
    pub fn issue(issue: Issue) -> Self {
        Self::new(
            Header::from_task(issue.task_id(), None),
            issue.to_string(),
            Payload::Issue(issue),
        )
    }

    /// Returns the header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the human-readable body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the typed payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the message, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Returns the routing kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    header: Header,
    #[serde(default)]
    body: String,
    message_type: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<WireMessage> for Message {
    type Error = MessagingError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = MessageKind::try_from(wire.message_type.as_str())
            .map_err(|_| MessagingError::UnknownKind(wire.message_type.clone()))?;
        let malformed = |err: serde_json::Error| MessagingError::Malformed(err.to_string());
        let payload = match kind {
            MessageKind::Feedback => {
                Payload::Feedback(serde_json::from_value(wire.payload).map_err(malformed)?)
            }
            MessageKind::Issue => {
                Payload::Issue(serde_json::from_value(wire.payload).map_err(malformed)?)
            }
            MessageKind::Direct => match wire.payload {
                Value::Null => Payload::Direct(Map::new()),
                Value::Object(map) => Payload::Direct(map),
                other => {
                    return Err(MessagingError::Malformed(format!(
                        "direct payload must be an object, got {other}"
                    )));
                }
            },
        };
        Ok(Self {
            header: wire.header,
            body: wire.body,
            payload,
        })
    }
}

#[derive(Serialize)]
struct WireMessageRef<'a> {
    header: &'a Header,
    body: &'a str,
    message_type: MessageKind,
    payload: &'a Payload,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireMessageRef {
            header: &self.header,
            body: &self.body,
            message_type: self.kind(),
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}
