//! Payloads the runtime itself understands.
//!
//! Application kinds (`broadcast`, `gossip`, `add`, ...) live in their own
//! crates. The runtime owns only the handshake and the error reply.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// Message kinds reserved by the runtime.
///
/// Handlers may not be registered for these.
pub const RESERVED_KINDS: [&str; 2] = [RuntimePayload::INIT, RuntimePayload::ERROR];

/// Runtime-level payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimePayload {
    /// First message a node receives: its own identity and the full peer list.
    Init(InitPayload),

    /// Acknowledges `init`.
    InitOk,

    /// A request could not be served.
    Error(ErrorBody),
}

impl RuntimePayload {
    pub const INIT: &'static str = "init";
    pub const INIT_OK: &'static str = "init_ok";
    pub const ERROR: &'static str = "error";
}

/// Identity handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// The receiving node's own id.
    pub node_id: NodeId,

    /// Every node in the cluster, including the receiver, in harness order.
    pub node_ids: Vec<NodeId>,
}

/// Body of an `error` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Well-known error codes.
///
/// Codes below 1000 are shared across every workload; anything else is
/// preserved as [`ErrorCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ErrorCode {
    Timeout,
    NodeNotFound,
    NotSupported,
    TemporarilyUnavailable,
    MalformedRequest,
    Crash,
    Abort,
    KeyDoesNotExist,
    KeyAlreadyExists,
    PreconditionFailed,
    TxnConflict,
    Custom(u32),
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        match self {
            Self::Timeout => 0,
            Self::NodeNotFound => 1,
            Self::NotSupported => 10,
            Self::TemporarilyUnavailable => 11,
            Self::MalformedRequest => 12,
            Self::Crash => 13,
            Self::Abort => 14,
            Self::KeyDoesNotExist => 20,
            Self::KeyAlreadyExists => 21,
            Self::PreconditionFailed => 22,
            Self::TxnConflict => 30,
            Self::Custom(code) => code,
        }
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Timeout,
            1 => Self::NodeNotFound,
            10 => Self::NotSupported,
            11 => Self::TemporarilyUnavailable,
            12 => Self::MalformedRequest,
            13 => Self::Crash,
            14 => Self::Abort,
            20 => Self::KeyDoesNotExist,
            21 => Self::KeyAlreadyExists,
            22 => Self::PreconditionFailed,
            30 => Self::TxnConflict,
            other => Self::Custom(other),
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::NodeNotFound => "node-not-found",
            Self::NotSupported => "not-supported",
            Self::TemporarilyUnavailable => "temporarily-unavailable",
            Self::MalformedRequest => "malformed-request",
            Self::Crash => "crash",
            Self::Abort => "abort",
            Self::KeyDoesNotExist => "key-does-not-exist",
            Self::KeyAlreadyExists => "key-already-exists",
            Self::PreconditionFailed => "precondition-failed",
            Self::TxnConflict => "txn-conflict",
            Self::Custom(_) => "custom",
        };
        write!(f, "{name} ({})", self.code())
    }
}
