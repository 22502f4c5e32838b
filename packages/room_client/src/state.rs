//! Client-side conversation state.
//!
//! [`ConversationState`] is plain data: every mutation is a total `&mut self`
//! method, so it can be exercised without a runtime and shared through
//! [`crate::store::ConversationStore`].

use chrono::{DateTime, SecondsFormat, Utc};
use room_protocol::{EventKind, LogRecord, Participant, WireEvent};

/// How an entry is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Join,
    Leave,
    /// Server notices, thinking placeholders included.
    SystemNotice,
    ConfigUpdate,
    /// Replayed history.
    LogReplay,
    Error,
    /// A wire type this client does not know; kept verbatim.
    Other(String),
}

impl MessageKind {
    pub fn from_event_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Join => Self::Join,
            EventKind::Leave => Self::Leave,
            EventKind::Chat => Self::Chat,
            EventKind::SystemMessage | EventKind::AiThinking => Self::SystemNotice,
            EventKind::Log => Self::LogReplay,
            EventKind::ConfigUpdate => Self::ConfigUpdate,
            EventKind::Error => Self::Error,
            EventKind::Unrecognized(other) => Self::Other(other.clone()),
        }
    }
}

/// One rendered entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub body: String,
    /// ISO-8601; falls back to the local receive time.
    pub timestamp: String,
    /// Marks a transient "is thinking" placeholder.
    pub is_thinking: bool,
}

impl Message {
    /// A notice with no sender.
    pub fn notice(kind: MessageKind, body: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            sender_id: None,
            sender_name: None,
            body: body.into(),
            timestamp: iso8601(received_at),
            is_thinking: false,
        }
    }

    /// The entry for a live event, taken as-is.
    pub fn from_wire(event: &WireEvent, received_at: DateTime<Utc>) -> Self {
        let kind = event.event_kind();
        Self {
            is_thinking: kind == EventKind::AiThinking || event.is_thinking.unwrap_or(false),
            kind: MessageKind::from_event_kind(&kind),
            sender_id: event.user_id.clone(),
            sender_name: event.username.clone(),
            body: event.body().to_string(),
            timestamp: timestamp_or(event.timestamp.as_deref(), received_at),
        }
    }

    /// A historical entry from a join's `chat_log`.
    pub fn from_log_record(record: &LogRecord, received_at: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::LogReplay,
            sender_id: record.user_id.clone(),
            sender_name: record.username.clone(),
            body: record.message.clone().unwrap_or_default(),
            timestamp: timestamp_or(record.timestamp.as_deref(), received_at),
            is_thinking: record.is_thinking.unwrap_or(false),
        }
    }

    /// True for a thinking placeholder posted under `name`.
    pub fn is_placeholder_for(&self, name: &str) -> bool {
        self.is_thinking && self.sender_name.as_deref() == Some(name)
    }
}

/// Format a timestamp the way the log stores it.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_or(timestamp: Option<&str>, received_at: DateTime<Utc>) -> String {
    match timestamp {
        Some(ts) if !ts.is_empty() => ts.to_string(),
        _ => iso8601(received_at),
    }
}

/// The server-issued credential of the local participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub token: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    identity: Option<Identity>,
    log: Vec<Message>,
    roster: Vec<Participant>,
    facilitator_enabled: bool,
    ai_participants: Vec<String>,
}

impl ConversationState {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn my_token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn facilitator_enabled(&self) -> bool {
        self.facilitator_enabled
    }

    /// Active AI participant names, in insertion order, without duplicates.
    pub fn ai_participants(&self) -> &[String] {
        &self.ai_participants
    }

    pub fn set_identity(&mut self, token: impl Into<String>, display_name: impl Into<String>) {
        self.identity = Some(Identity {
            token: token.into(),
            display_name: display_name.into(),
        });
    }

    pub fn append_message(&mut self, message: Message) {
        self.log.push(message);
    }

    pub fn replace_roster(&mut self, roster: Vec<Participant>) {
        self.roster = roster;
    }

    /// Replace the whole log with replayed history.
    pub fn replace_log(&mut self, history: Vec<Message>) {
        self.log = history
            .into_iter()
            .map(|mut m| {
                m.kind = MessageKind::LogReplay;
                m
            })
            .collect();
    }

    pub fn set_facilitator(&mut self, enabled: bool) {
        self.facilitator_enabled = enabled;
    }

    /// Replace the AI set. Later duplicates are dropped.
    pub fn set_ai_participants(&mut self, names: Vec<String>) {
        self.ai_participants.clear();
        for name in names {
            self.add_ai_participant(name);
        }
    }

    /// Returns false when the name was already present.
    pub fn add_ai_participant(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.ai_participants.contains(&name) {
            return false;
        }
        self.ai_participants.push(name);
        true
    }

    /// Returns false when the name was not present.
    pub fn remove_ai_participant(&mut self, name: &str) -> bool {
        let before = self.ai_participants.len();
        self.ai_participants.retain(|n| n != name);
        self.ai_participants.len() != before
    }

    /// Drop every thinking placeholder of the reply's sender, then append the
    /// reply. Returns how many placeholders were removed.
    pub fn reconcile_ai_reply(&mut self, reply: Message) -> usize {
        let before = self.log.len();
        if let Some(name) = reply.sender_name.as_deref().filter(|n| !n.is_empty()) {
            self.log.retain(|m| !m.is_placeholder_for(name));
        }
        let removed = before - self.log.len();
        self.log.push(reply);
        removed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn chat(name: &str, body: &str, thinking: bool) -> Message {
        Message {
            kind: MessageKind::Chat,
            sender_id: Some(format!("AIAssistant_{name}")),
            sender_name: Some(name.to_string()),
            body: body.to_string(),
            timestamp: iso8601(at()),
            is_thinking: thinking,
        }
    }

    #[test]
    fn reconcile_drops_only_matching_placeholders() {
        let mut state = ConversationState::default();
        state.append_message(chat("Ann", "question?", false));
        state.append_message(chat("Sage", "Sage is thinking...", true));
        state.append_message(chat("Kai", "Kai is thinking...", true));
        state.append_message(chat("Sage", "still thinking", true));

        let removed = state.reconcile_ai_reply(chat("Sage", "answer", false));

        assert_eq!(removed, 2);
        let bodies: Vec<_> = state.log().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["question?", "Kai is thinking...", "answer"]);
    }

    #[test]
    fn reconcile_without_name_only_appends() {
        let mut state = ConversationState::default();
        state.append_message(chat("Sage", "...", true));
        let mut reply = chat("Sage", "anon", false);
        reply.sender_name = None;

        assert_eq!(state.reconcile_ai_reply(reply), 0);
        assert_eq!(state.log().len(), 2);
    }

    #[test]
    fn thinking_system_notice_is_a_placeholder() {
        let mut state = ConversationState::default();
        let mut notice = Message::notice(MessageKind::SystemNotice, "Sage is thinking...", at());
        notice.sender_name = Some("Sage".into());
        notice.is_thinking = true;
        state.append_message(notice);

        assert_eq!(state.reconcile_ai_reply(chat("Sage", "done", false)), 1);
        assert_eq!(state.log().len(), 1);
    }

    #[test]
    fn ai_set_deduplicates() {
        let mut state = ConversationState::default();
        state.set_ai_participants(vec!["Sage".into(), "Kai".into(), "Sage".into()]);
        assert_eq!(state.ai_participants(), ["Sage", "Kai"]);

        assert!(!state.add_ai_participant("Kai"));
        assert!(state.add_ai_participant("Nova"));
        assert_eq!(state.ai_participants(), ["Sage", "Kai", "Nova"]);

        assert!(state.remove_ai_participant("Sage"));
        assert!(!state.remove_ai_participant("Sage"));
        assert_eq!(state.ai_participants(), ["Kai", "Nova"]);
    }

    #[test]
    fn replace_log_tags_history() {
        let mut state = ConversationState::default();
        state.append_message(chat("Ann", "old", false));
        state.replace_log(vec![chat("Bo", "hi", false)]);

        assert_eq!(state.log().len(), 1);
        assert_eq!(state.log()[0].kind, MessageKind::LogReplay);
        assert_eq!(state.log()[0].body, "hi");
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut state = ConversationState::default();
        state.set_identity("t1", "Ann");
        state.append_message(chat("Ann", "hi", false));
        state.replace_roster(vec![Participant::new("t1", "Ann")]);
        state.set_facilitator(true);
        state.add_ai_participant("Sage");

        state.reset();
        assert_eq!(state, ConversationState::default());
        assert!(state.identity().is_none());
    }

    #[test]
    fn wire_entry_defaults() {
        let event = WireEvent {
            kind: "ai_thinking".into(),
            username: Some("Kai".into()),
            ..Default::default()
        };
        let entry = Message::from_wire(&event, at());
        assert_eq!(entry.kind, MessageKind::SystemNotice);
        assert!(entry.is_thinking);
        assert_eq!(entry.body, "");
        assert_eq!(entry.timestamp, "2024-05-01T12:00:00.000Z");

        let stamped = WireEvent {
            kind: "shout".into(),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        let entry = Message::from_wire(&stamped, at());
        assert_eq!(entry.kind, MessageKind::Other("shout".into()));
        assert_eq!(entry.timestamp, "2024-01-01T00:00:00Z");
    }
}
