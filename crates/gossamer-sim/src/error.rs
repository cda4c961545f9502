//! Simulation errors.

use gossamer_node::NodeError;
use gossamer_wire::{NodeId, WireError};
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// A node returned a fatal error; in production it would have exited.
    #[error("node {id} failed: {source}")]
    Node {
        id: NodeId,
        #[source]
        source: NodeError,
    },

    #[error("no node named {0}")]
    UnknownNode(NodeId),

    #[error("network still busy after {0} deliveries")]
    NotQuiet(usize),

    #[error(transparent)]
    Wire(#[from] WireError),
}
