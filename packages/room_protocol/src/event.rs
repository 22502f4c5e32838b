//! Inbound room events and the outbound chat payload.
//!
//! Every inbound frame is a flat JSON object tagged by `type`. Most fields are
//! optional and several of them (`users`, `active_user`,
//! `facilitator_enabled`, `active_ai_participants`) piggyback room state on
//! unrelated events, so frames are decoded into one permissive [`WireEvent`]
//! and then classified into a [`RoomEvent`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtocolDecodeError;
use crate::participant::Participant;

/// One inbound frame, as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
    /// Full roster carried by join/leave events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<Participant>>,
    /// Roster piggybacked on other events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_user: Option<Vec<Participant>>,
    /// Room history, sent to a participant when it joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_log: Option<Vec<LogRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilitator_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ai_participants: Option<Vec<String>>,
}

impl WireEvent {
    pub fn body(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// The server's wire type, classified.
    pub fn event_kind(&self) -> EventKind {
        EventKind::from_wire(&self.kind)
    }

    /// True when this event carries any of the piggybacked room-state fields.
    pub fn carries_room_state(&self) -> bool {
        self.facilitator_enabled.is_some()
            || self.active_user.is_some()
            || self.active_ai_participants.is_some()
    }
}

/// A historical entry inside `chat_log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
}

/// `timestamp` is display-only: strings are kept as sent, numbers become their
/// decimal text and any other shape counts as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(ts)) => Some(ts),
        Some(Value::Number(ts)) => Some(ts.to_string()),
        _ => None,
    })
}

/// Wire `type` values the client knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Join,
    Leave,
    Chat,
    SystemMessage,
    /// Dedicated thinking-placeholder event.
    AiThinking,
    Log,
    ConfigUpdate,
    Error,
    Unrecognized(String),
}

impl EventKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "join" => Self::Join,
            "leave" => Self::Leave,
            "chat" => Self::Chat,
            "system_message" => Self::SystemMessage,
            "ai_thinking" => Self::AiThinking,
            "log" => Self::Log,
            "config_update" => Self::ConfigUpdate,
            "error" => Self::Error,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// A decoded event, classified by the rule the dispatcher applies to it.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Join(WireEvent),
    Leave(WireEvent),
    /// A chat event explicitly marked `is_thinking: false`: a finished reply
    /// that replaces the sender's thinking placeholders.
    FinalReply(WireEvent),
    /// Any other chat event, thinking placeholders included.
    Chat(WireEvent),
    SystemMessage(WireEvent),
    /// Every other wire type; appended as-is.
    Other(WireEvent),
}

impl RoomEvent {
    /// Decode and classify one text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolDecodeError> {
        let event: WireEvent = serde_json::from_str(frame)?;
        if event.kind.is_empty() {
            return Err(ProtocolDecodeError::MissingType);
        }
        Ok(Self::classify(event))
    }

    pub fn classify(event: WireEvent) -> Self {
        match event.event_kind() {
            EventKind::Join => Self::Join(event),
            EventKind::Leave => Self::Leave(event),
            EventKind::Chat if event.is_thinking == Some(false) => Self::FinalReply(event),
            EventKind::Chat => Self::Chat(event),
            EventKind::SystemMessage => Self::SystemMessage(event),
            EventKind::AiThinking
            | EventKind::Log
            | EventKind::ConfigUpdate
            | EventKind::Error
            | EventKind::Unrecognized(_) => Self::Other(event),
        }
    }

    pub fn wire(&self) -> &WireEvent {
        match self {
            Self::Join(e)
            | Self::Leave(e)
            | Self::FinalReply(e)
            | Self::Chat(e)
            | Self::SystemMessage(e)
            | Self::Other(e) => e,
        }
    }
}

/// Frame sent by the client for a user-authored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundChat {
    pub message: String,
}

impl OutboundChat {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
