//! # gossamer-sim: Deterministic cluster simulation
//!
//! Runs several [`Node`](gossamer_node::Node)s in one process with a
//! simulated network between them. Nothing here touches real I/O or real
//! time:
//!
//! - **Network**: in-flight messages are delivered one at a time in an order
//!   chosen by a seeded RNG, and may be dropped or duplicated
//! - **Time**: every node runs on a [`ManualClock`](gossamer_node::ManualClock)
//!   that the cluster advances explicitly
//! - **Services**: requests to `seq-kv`, `lin-kv` and `lww-kv` are answered
//!   by an in-memory [`KvStore`]
//!
//! The same seed always produces the same interleaving, so a failing run can
//! be replayed exactly.
//!
//! ```
//! use gossamer_node::{ManualClock, Node};
//! use gossamer_sim::{Cluster, SimConfig};
//!
//! let cluster = Cluster::new(SimConfig::reliable(7), &["n0", "n1"], |_| {
//!     Node::with_clock((), ManualClock::new())
//! })
//! .unwrap();
//!
//! assert!(cluster.node("n1").unwrap().is_initialized());
//! ```

mod cluster;
mod config;
mod error;
mod kv;
mod rng;

#[cfg(test)]
mod tests;

pub use cluster::{CLIENT, Cluster, HARNESS, MAX_DELIVERIES_PER_ROUND};
pub use config::{NetworkStats, SimConfig};
pub use error::{SimError, SimResult};
pub use kv::KvStore;
pub use rng::SimRng;
