//! Plain-text rendering of the conversation for terminal output.

use chrono::{DateTime, Local};
use room_protocol::{Participant, ParticipantRole};

use crate::state::{ConversationState, Message, MessageKind};

/// One log entry as a single line.
pub fn format_entry(entry: &Message, my_token: Option<&str>) -> String {
    let time = short_time(&entry.timestamp);
    let sender = entry.sender_name.as_deref().unwrap_or("unknown");

    if entry.is_thinking {
        return format!("[{time}] ... {sender} is thinking...");
    }
    match &entry.kind {
        MessageKind::Chat => {
            let badge = entry
                .sender_id
                .as_deref()
                .map(|id| role_badge(ParticipantRole::of(id, my_token)))
                .unwrap_or_default();
            format!("[{time}] {sender}{badge}: {}", entry.body)
        }
        MessageKind::Join | MessageKind::Leave => format!("[{time}] * {}", entry.body),
        MessageKind::SystemNotice | MessageKind::ConfigUpdate => {
            format!("[{time}] -- {}", entry.body)
        }
        MessageKind::LogReplay => format!("[{time}] {sender} (history): {}", entry.body),
        MessageKind::Error => format!("[{time}] ! {}", entry.body),
        MessageKind::Other(kind) => format!("[{time}] <{kind}> {}", entry.body),
    }
}

/// Roster lines, followed by the room settings.
pub fn format_roster(state: &ConversationState) -> Vec<String> {
    let mut lines: Vec<String> = state
        .roster()
        .iter()
        .map(|p| format_participant(p, state.my_token()))
        .collect();
    lines.push(format!(
        "facilitator: {}",
        if state.facilitator_enabled() { "on" } else { "off" }
    ));
    if state.ai_participants().is_empty() {
        lines.push("AI participants: none".to_string());
    } else {
        lines.push(format!("AI participants: {}", state.ai_participants().join(", ")));
    }
    lines
}

fn format_participant(participant: &Participant, my_token: Option<&str>) -> String {
    format!(
        "  {}{}",
        participant.display_name,
        role_badge(participant.role(my_token))
    )
}

fn role_badge(role: ParticipantRole) -> &'static str {
    match role {
        ParticipantRole::Me => " [me]",
        ParticipantRole::Facilitator => " [facilitator]",
        ParticipantRole::AiParticipant => " [ai]",
        ParticipantRole::Human => "",
    }
}

fn short_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Tracks which log entries have already been printed.
///
/// The log grows by appending, except that a final AI reply removes thinking
/// placeholders and a join may replace the whole log with history. Only
/// placeholders are ever removed from the middle, so the cursor remembers the
/// last printed entry that is not a placeholder (with its index) plus the
/// placeholders printed after it.
#[derive(Debug, Default)]
pub struct LogCursor {
    anchor: Option<(usize, Message)>,
    pending: Vec<Message>,
}

impl LogCursor {
    /// Entries of `log` not printed yet. Marks them as printed.
    pub fn advance<'a>(&mut self, log: &'a [Message]) -> Vec<&'a Message> {
        let start = match &self.anchor {
            Some((index, anchor)) => {
                // Removals only shift the anchor towards the front.
                let upto = (index + 1).min(log.len());
                match log[..upto].iter().rposition(|m| m == anchor) {
                    Some(i) => i + 1,
                    None => {
                        self.pending.clear();
                        0
                    }
                }
            }
            None => 0,
        };

        let fresh: Vec<&Message> = log[start..]
            .iter()
            .filter(|m| !(m.is_thinking && self.pending.contains(m)))
            .collect();

        let tail_start = match log[start..].iter().rposition(|m| !m.is_thinking) {
            Some(offset) => {
                let i = start + offset;
                self.anchor = Some((i, log[i].clone()));
                i + 1
            }
            None => {
                if start == 0 {
                    self.anchor = None;
                }
                start
            }
        };
        self.pending = log[tail_start..].to_vec();
        fresh
    }
}
