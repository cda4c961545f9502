//! # gossamer-node: Dispatch runtime for `gossamer`
//!
//! A [`Node`] owns everything a participant needs to take part in a
//! message-passing cluster: its identity and peer list, the neighbour
//! [`Topology`], a handler table keyed by message type, a callback table
//! keyed by correlation id, and an ordered list of periodic hooks.
//!
//! ## Key Principles
//!
//! - **Single-threaded**: exactly one receive/dispatch/process step runs at
//!   a time, so no state is shared or locked
//! - **No IO in the core**: [`Node::handle`] and [`Node::tick`] return the
//!   envelopes to send; the [`shell`] writes them out
//! - **Injected time**: hooks read time from the context, stamped by a
//!   pluggable [`Clock`], so simulations can drive it
//! - **Fail fast**: fatal errors end the loop; recoverable ones are logged
//!   and the next message is processed
//!
//! ## Example
//!
//! ```
//! use gossamer_node::Node;
//! use gossamer_wire::Body;
//!
//! let mut node = Node::new(0u64);
//! node.register_handler("ping", |ctx, request| {
//!     *ctx.state_mut() += 1;
//!     ctx.reply_to(&request, Body::new("pong"))
//! })
//! .unwrap();
//!
//! let init = r#"{"src":"c0","dest":"n0","body":{"type":"init","msg_id":1,"node_id":"n0","node_ids":["n0"]}}"#;
//! let out = node.handle_line(init).unwrap();
//! assert_eq!(out[0].kind(), "init_ok");
//!
//! let ping = r#"{"src":"c1","dest":"n0","body":{"type":"ping","msg_id":2}}"#;
//! let out = node.handle_line(ping).unwrap();
//! assert_eq!(out[0].kind(), "pong");
//! assert_eq!(*node.state(), 1);
//! ```

pub mod clock;
pub mod context;
pub mod error;
pub mod kv;
pub mod node;
pub mod shell;
pub mod topology;


pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{Callback, Context};
pub use error::{ConfigurationError, KvError, NodeError, NodeResult, ProtocolError};
pub use kv::{KvClient, KvPayload, KvReply};
pub use node::{DispatchStats, Handler, Hook, Node};
pub use shell::{Shutdown, serve};
pub use topology::Topology;
