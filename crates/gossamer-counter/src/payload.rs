//! Counter workload messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CounterPayload {
    /// Increment by a non-negative amount.
    Add { delta: u64 },
    AddOk,

    /// Current cluster-wide value.
    Read,
    ReadOk { value: u64 },
}

impl CounterPayload {
    pub const REQUEST_KINDS: [&'static str; 2] = ["add", "read"];
}
