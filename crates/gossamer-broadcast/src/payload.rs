//! Broadcast workload messages.

use gossamer_node::Topology;
use serde::{Deserialize, Serialize};

use crate::state::Value;

/// Messages of the broadcast workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastPayload {
    /// Client adds a value.
    Broadcast { message: Value },
    BroadcastOk,

    /// Client asks for every value this node knows.
    Read,
    ReadOk { messages: Vec<Value> },

    /// Harness installs an explicit neighbour graph.
    Topology { topology: Topology },
    TopologyOk,

    /// Node-to-node delta. Fire-and-forget; never answered.
    Gossip { seen: Vec<Value> },
}

impl BroadcastPayload {
    /// Kinds a node registers handlers for.
    pub const REQUEST_KINDS: [&'static str; 4] = ["broadcast", "read", "topology", "gossip"];
}
