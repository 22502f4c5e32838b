use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// A configured endpoint could not be turned into a usable URL.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid {field} `{url}`: {reason}")]
    Invalid {
        field: &'static str,
        url: String,
        reason: String,
    },

    #[error("unsupported scheme `{scheme}` for {field}")]
    UnsupportedScheme { field: &'static str, scheme: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory; pass --data-dir")]
    NoHomeDir,

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("session.outbound_queue must be at least 1")]
    EmptyOutboundQueue,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// The token endpoint did not yield a usable credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("credential request rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("credential response is missing `{0}`")]
    MissingField(&'static str),
}

/// Failures of the room socket, both at handshake time and mid-session.
///
/// The `Display` text is what ends up in the session status, so each variant
/// reads as a user-facing sentence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not reach the chat server: {0}")]
    Unreachable(String),

    #[error("connection rejected: {0}")]
    Rejected(String),

    #[error("connection lost unexpectedly: {0}")]
    Lost(String),

    #[error("websocket connection error: {0}")]
    Socket(String),
}

impl TransportError {
    /// Classify a failed websocket handshake.
    pub fn from_handshake(err: tungstenite::Error) -> Self {
        match &err {
            tungstenite::Error::Http(response) => {
                let status = response.status();
                if status.as_u16() == 401 || status.as_u16() == 403 {
                    Self::Rejected("authentication error".to_string())
                } else {
                    Self::Unreachable(format!("server answered {status}"))
                }
            }
            tungstenite::Error::Io(_) | tungstenite::Error::Url(_) => {
                Self::Unreachable(err.to_string())
            }
            _ => Self::Socket(err.to_string()),
        }
    }

    /// Classify an error raised while the session was open.
    pub fn from_stream(err: tungstenite::Error) -> Self {
        match &err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::Lost("unknown error".to_string())
            }
            tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
            ) => Self::Lost("reset without closing handshake".to_string()),
            _ => Self::Socket(err.to_string()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("not connected to a room")]
    NotConnected,

    #[error("message is empty")]
    EmptyMessage,

    #[error("outbound queue is full; try again")]
    QueueFull,

    #[error("failed to encode message: {0}")]
    Encode(String),
}

/// Failures of the room management endpoints.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no room selected")]
    MissingRoom,

    #[error("AI participant name is empty")]
    EmptyName,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{action} failed ({status}): {reason}")]
    Rejected {
        action: &'static str,
        status: u16,
        reason: String,
    },
}

/// Why `SessionConnector::connect` did not reach the open state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
