//! Wire error types.

use thiserror::Error;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while encoding or interpreting messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// An input line was not a valid envelope.
    #[error("malformed envelope: {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    /// A value could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),

    /// A body did not match the payload its handler expects.
    #[error("malformed {kind} body: {source}")]
    Payload {
        kind: String,
        source: serde_json::Error,
    },

    /// A payload serialized to something other than a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A payload serialized without a string `type` tag.
    #[error("payload has no type tag")]
    MissingType,
}

impl WireError {
    /// Returns true if the error came from untrusted input rather than from
    /// this node's own encoding.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Payload { .. })
    }
}
