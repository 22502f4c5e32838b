use thiserror::Error;

/// A frame that could not be decoded into a [`crate::WireEvent`].
#[derive(Debug, Error)]
pub enum ProtocolDecodeError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event is missing a type")]
    MissingType,
}
