//! # gossamer-wire: Message model for `gossamer` nodes
//!
//! Nodes exchange one JSON-encoded [`Envelope`] per line. Every envelope
//! carries a [`Body`] whose `type` field discriminates the message kind and
//! whose optional `msg_id` / `in_reply_to` fields correlate requests with
//! replies.
//!
//! ## Layers
//!
//! - [`ids`]: [`NodeId`] and [`MsgId`] newtypes
//! - [`envelope`]: [`Envelope`] and the loosely-typed [`Body`]
//! - [`payload`]: typed payloads owned by the runtime (`init`, `error`)
//! - [`codec`]: line encoding and decoding
//!
//! Application crates define their own payload enums tagged by `type` and
//! convert with [`Body::from_payload`] / [`Body::decode`].
//!
//! ## Example
//!
//! ```
//! use gossamer_wire::{Envelope, codec};
//!
//! let line = r#"{"src":"c1","dest":"n0","body":{"type":"read","msg_id":3}}"#;
//! let envelope: Envelope = codec::decode_line(line).unwrap();
//!
//! assert_eq!(envelope.body.kind, "read");
//! assert_eq!(envelope.body.msg_id.map(u64::from), Some(3));
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod payload;


pub use envelope::{Body, Envelope};
pub use error::{WireError, WireResult};
pub use ids::{MsgId, NodeId};
pub use payload::{ErrorBody, ErrorCode, InitPayload, RuntimePayload};
