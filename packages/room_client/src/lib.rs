//! Session client for group-chat rooms shared by humans, an AI facilitator and
//! AI participants.
//!
//! The [`connector::SessionConnector`] owns the room session and feeds a
//! [`store::ConversationStore`]; observers subscribe to the store and to the
//! session status.

pub mod config;
pub mod connector;
pub mod controls;
pub mod credential;
pub mod dispatch;
pub mod endpoints;
pub mod error;
pub mod render;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ClientPaths, FileConfig, load_config};
pub use connector::{SessionConnector, SessionPhase, SessionStatus};
pub use controls::RoomControls;
pub use credential::{Credential, CredentialExchange};
pub use dispatch::{DispatchOutcome, dispatch_frame};
pub use endpoints::Endpoints;
pub use error::{
    ConfigError, ControlError, CredentialError, EndpointError, SendError, SessionError,
    TransportError,
};
pub use state::{ConversationState, Identity, Message, MessageKind};
pub use store::ConversationStore;
