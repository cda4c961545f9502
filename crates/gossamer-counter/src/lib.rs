//! # gossamer-counter: Grow-only counter over a key-value service
//!
//! Each node owns one key in the key-value service, named after its node
//! id, holding the sum of every `add` it has accepted. A `read` sums the
//! local total with every peer's key.
//!
//! - `add` is acknowledged as soon as the local total is updated; the
//!   total reaches the store asynchronously, one write at a time
//! - writes are compare-and-set from the last value known to be stored, so
//!   a delayed or duplicated write can never move a key backwards
//! - `read` fans out one request per peer and answers when the last reply
//!   arrives, or when the request timeout expires with whatever arrived
//!
//! ```
//! use gossamer_counter::{CounterConfig, CounterState, install};
//! use gossamer_node::Node;
//!
//! let mut node = Node::new(CounterState::new(CounterConfig::default()));
//! install(&mut node).unwrap();
//!
//! node.handle_line(r#"{"src":"c0","dest":"n0","body":{"type":"init","msg_id":1,"node_id":"n0","node_ids":["n0"]}}"#).unwrap();
//! node.handle_line(r#"{"src":"c1","dest":"n0","body":{"type":"add","msg_id":2,"delta":3}}"#).unwrap();
//!
//! assert_eq!(node.state().total(), 3);
//! ```

pub mod counter;
pub mod payload;
pub mod state;

#[cfg(test)]
mod tests;

pub use counter::{flush, install};
pub use payload::CounterPayload;
pub use state::{CounterConfig, CounterState};
