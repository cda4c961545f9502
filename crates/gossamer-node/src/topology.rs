//! Neighbour graph.

use std::collections::BTreeMap;

use gossamer_wire::NodeId;
use serde::{Deserialize, Serialize};

/// Mapping from each node to its ordered neighbours.
///
/// Built once at initialization from the peer list and replaced wholesale
/// by an explicit `topology` message (last write wins, no merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topology(BTreeMap<NodeId, Vec<NodeId>>);

impl Topology {
    /// Connects the peer at index `i` to the peers at `i - 1` and `i + 1`.
    ///
    /// ```
    /// # use gossamer_node::Topology;
    /// # use gossamer_wire::NodeId;
    /// let ids: Vec<NodeId> = ["n0", "n1", "n2"].into_iter().map(NodeId::from).collect();
    /// let topology = Topology::line(&ids);
    ///
    /// assert_eq!(topology.neighbors(&ids[0]), &ids[1..2]);
    /// assert_eq!(topology.neighbors(&ids[1]), &[ids[0].clone(), ids[2].clone()]);
    /// ```
    pub fn line(ids: &[NodeId]) -> Self {
        let mut map = BTreeMap::new();
        for (i, id) in ids.iter().enumerate() {
            let mut neighbors = Vec::with_capacity(2);
            if i > 0 {
                neighbors.push(ids[i - 1].clone());
            }
            if let Some(next) = ids.get(i + 1) {
                neighbors.push(next.clone());
            }
            map.insert(id.clone(), neighbors);
        }
        Self(map)
    }

    /// Installs a topology exactly as given.
    pub fn from_map(map: impl IntoIterator<Item = (NodeId, Vec<NodeId>)>) -> Self {
        Self(map.into_iter().collect())
    }

    /// Returns the neighbours of `id`, or nothing if `id` is unknown.
    pub fn neighbors(&self, id: &NodeId) -> &[NodeId] {
        self.0.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
