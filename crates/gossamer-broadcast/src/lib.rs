//! # gossamer-broadcast: Gossip broadcast over a grow-only set
//!
//! Every node keeps the set of values it has learned. Clients add values
//! with `broadcast` and observe them with `read`; nodes reconcile with their
//! neighbours through periodic `gossip` deltas (anti-entropy).
//!
//! ## Guarantees
//!
//! - **Local acceptance**: `broadcast_ok` is sent as soon as the value is in
//!   the local set; it never waits for propagation
//! - **Convergence**: set union is commutative, associative and idempotent,
//!   so every node on a connected topology ends with the union of all
//!   broadcast values regardless of loss, duplication or reordering
//! - **Self-healing**: lost gossip is never retried explicitly; the next
//!   round recomputes and resends the delta
//!
//! ## Example
//!
//! ```
//! use gossamer_broadcast::{BroadcastState, GossipConfig, install};
//! use gossamer_node::Node;
//!
//! let mut node = Node::new(BroadcastState::new(GossipConfig::default()));
//! install(&mut node).unwrap();
//!
//! node.handle_line(r#"{"src":"c0","dest":"n0","body":{"type":"init","msg_id":1,"node_id":"n0","node_ids":["n0","n1"]}}"#).unwrap();
//! node.handle_line(r#"{"src":"c1","dest":"n0","body":{"type":"broadcast","msg_id":2,"message":5}}"#).unwrap();
//!
//! assert!(node.state().contains(5));
//! ```

pub mod gossip;
pub mod payload;
pub mod state;


pub use gossip::{install, propagate};
pub use payload::BroadcastPayload;
pub use state::{BroadcastState, GossipConfig, Value};
