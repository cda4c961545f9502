//! Error types for the dispatch runtime.
//!
//! Errors fall into two groups. Fatal errors (bad configuration, a message
//! before the handshake, I/O failure) end the receive loop so an external
//! supervisor can restart the node. Everything else is logged and the loop
//! moves on to the next message.

use std::fmt::Display;

use gossamer_wire::{ErrorCode, WireError};
use thiserror::Error;

/// Result type for runtime operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Handler table misuse, detected at startup.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A peer or handler broke the request/reply protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Malformed input or an encoding failure.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Transport failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Application-level failure raised by a handler, callback or hook.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl NodeError {
    /// Creates a [`NodeError::Handler`] from any displayable reason.
    pub fn handler(reason: impl Display) -> Self {
        Self::Handler(reason.to_string())
    }

    /// Returns true if the receive loop must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Io(_) | Self::Handler(_) => true,
            Self::Protocol(e) => matches!(e, ProtocolError::NotInitialized { .. }),
            Self::Wire(e) => !e.is_input_error(),
        }
    }
}

/// Handler registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `init` and `error` are handled by the runtime itself.
    #[error("cannot register a handler for reserved message type {0:?}")]
    ReservedType(String),

    /// Each message type has at most one handler.
    #[error("a handler for {0:?} is already registered")]
    DuplicateHandler(String),
}

/// Request/reply protocol violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A message arrived before the node learned its identity.
    #[error("received {kind} before init")]
    NotInitialized { kind: String },

    /// The handshake was repeated.
    #[error("node is already initialized")]
    AlreadyInitialized,

    /// A reply was attempted on a request that carries no `msg_id`.
    #[error("cannot reply to {kind}: request has no msg_id")]
    MissingMsgId { kind: String },
}

/// Errors surfaced to key-value callbacks.
#[derive(Debug, Error)]
pub enum KvError {
    /// The service answered with an `error` body.
    #[error("kv service error {code}: {}", text.as_deref().unwrap_or("no detail"))]
    Service { code: ErrorCode, text: Option<String> },

    /// The service answered with a kind the request does not expect.
    #[error("unexpected kv reply {0:?}")]
    UnexpectedReply(String),

    /// The reply body did not decode.
    #[error("malformed kv reply: {0}")]
    Malformed(#[from] WireError),
}

impl KvError {
    /// Returns the service error code, if this is a service error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}
