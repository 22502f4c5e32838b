//! Inbound frame dispatcher.
//!
//! Applies one decoded room event to the conversation state. Dispatch is total:
//! a frame that fails to decode becomes an error notice in the log instead of
//! an error for the caller, so a bad frame never tears down the session.

use chrono::{DateTime, Utc};
use room_protocol::{RoomEvent, WireEvent};
use tracing::{debug, warn};

use crate::state::{ConversationState, Message, MessageKind};

/// What a dispatched frame did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// A final AI reply replaced this many thinking placeholders.
    Reconciled(usize),
    /// The frame did not decode; an error notice was logged instead.
    Malformed,
}

/// Decode `frame` and apply it to `state`.
pub fn dispatch_frame(
    state: &mut ConversationState,
    frame: &str,
    received_at: DateTime<Utc>,
) -> DispatchOutcome {
    match RoomEvent::decode(frame) {
        Ok(event) => apply_event(state, event, received_at),
        Err(e) => {
            warn!(error = %e, "dropping undecodable room frame");
            state.append_message(Message::notice(
                MessageKind::Error,
                format!("Error processing message: {frame}"),
                received_at,
            ));
            DispatchOutcome::Malformed
        }
    }
}

pub fn apply_event(
    state: &mut ConversationState,
    event: RoomEvent,
    received_at: DateTime<Utc>,
) -> DispatchOutcome {
    debug!(kind = %event.wire().kind, "dispatching room event");
    match event {
        RoomEvent::Join(e) => {
            state.replace_roster(e.users.clone().unwrap_or_default());
            // History first, so the join notice lands after it.
            if let Some(history) = &e.chat_log {
                debug!(entries = history.len(), "replaying room history");
                state.replace_log(
                    history
                        .iter()
                        .map(|record| Message::from_log_record(record, received_at))
                        .collect(),
                );
            }
            let body = format!("{} joined", notice_name(state, &e));
            state.append_message(presence(MessageKind::Join, &e, body, received_at));
            refresh_room_state(state, &e);
        }
        RoomEvent::Leave(e) => {
            state.replace_roster(e.users.clone().unwrap_or_default());
            let body = format!("{} left", notice_name(state, &e));
            state.append_message(presence(MessageKind::Leave, &e, body, received_at));
            refresh_room_state(state, &e);
        }
        RoomEvent::FinalReply(e) => {
            let removed = state.reconcile_ai_reply(Message::from_wire(&e, received_at));
            debug!(sender = ?e.username, removed, "AI reply reconciled");
            return DispatchOutcome::Reconciled(removed);
        }
        RoomEvent::Chat(e) => {
            state.append_message(Message::from_wire(&e, received_at));
        }
        RoomEvent::SystemMessage(e) => {
            refresh_room_state(state, &e);
            state.append_message(Message::from_wire(&e, received_at));
        }
        RoomEvent::Other(e) => {
            state.append_message(Message::from_wire(&e, received_at));
            refresh_room_state(state, &e);
        }
    }
    DispatchOutcome::Applied
}

/// Overwrite each piggybacked room-state field that is present.
fn refresh_room_state(state: &mut ConversationState, event: &WireEvent) {
    if !event.carries_room_state() {
        return;
    }
    if let Some(enabled) = event.facilitator_enabled {
        state.set_facilitator(enabled);
    }
    if let Some(roster) = &event.active_user {
        state.replace_roster(roster.clone());
    }
    if let Some(names) = &event.active_ai_participants {
        state.set_ai_participants(names.clone());
    }
}

/// Name used in join/leave notices.
fn notice_name(state: &ConversationState, event: &WireEvent) -> String {
    if let (Some(identity), Some(user_id)) = (state.identity(), event.user_id.as_deref()) {
        if identity.token == user_id {
            return identity.display_name.clone();
        }
    }
    if let Some(name) = event.username.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    match event.user_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.chars().take(8).collect(),
        None => "unknown".to_string(),
    }
}

fn presence(kind: MessageKind, event: &WireEvent, body: String, received_at: DateTime<Utc>) -> Message {
    let mut message = Message::notice(kind, body, received_at);
    message.sender_id = event.user_id.clone();
    message.sender_name = event.username.clone();
    if let Some(ts) = event.timestamp.as_deref().filter(|ts| !ts.is_empty()) {
        message.timestamp = ts.to_string();
    }
    message
}
