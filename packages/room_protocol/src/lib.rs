//! Wire contract for the group-chat room service.
//!
//! The room backend pushes JSON events over a websocket at
//! `{base}/ws/{room_id}?token={token}` and accepts `{ "message": ... }`
//! frames back. Credentials and room controls go through small JSON HTTP
//! endpoints. This crate holds only the shapes of that traffic; it has no
//! knowledge of sockets or local state.

pub mod error;
pub mod event;
pub mod http;
pub mod participant;

pub use error::ProtocolDecodeError;
pub use event::{EventKind, LogRecord, OutboundChat, RoomEvent, WireEvent};
pub use http::{
    AiParticipantAdded, AiParticipantRemoved, ErrorBody, FacilitatorToggle, TokenRequest,
    TokenResponse,
};
pub use participant::{AI_PARTICIPANT_PREFIX, FACILITATOR_ID, Participant, ParticipantRole};

/// Close code the server uses when it rejects the token or the room.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Close code reported for a connection that dropped without a close handshake.
pub const CLOSE_ABNORMAL: u16 = 1006;
