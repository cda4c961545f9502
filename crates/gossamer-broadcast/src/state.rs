//! Grow-only set state and per-neighbour knowledge.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use gossamer_wire::NodeId;

/// A broadcast value.
pub type Value = i64;

/// Gossip tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GossipConfig {
    /// Minimum spacing between two gossip rounds.
    pub interval: Duration,
    /// Track what each neighbour is believed to know and send only deltas.
    /// When off, every round sends the full set.
    pub track_neighbors: bool,
    /// Every Nth round ignores the known sets and sends everything.
    /// Zero disables full syncs, and with them the optimistic marking of
    /// sent values: only gossip actually received counts as known.
    pub full_sync_every: u32,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            track_neighbors: true,
            full_sync_every: 10,
        }
    }
}

/// State of one broadcast node.
///
/// `messages` only ever grows. `known` is an optimisation: it may be stale
/// or empty without affecting convergence, only the volume of gossip.
#[derive(Debug, Clone, Default)]
pub struct BroadcastState {
    config: GossipConfig,
    messages: BTreeSet<Value>,
    known: HashMap<NodeId, BTreeSet<Value>>,
    last_round_ns: Option<u64>,
    rounds: u64,
}

impl BroadcastState {
    pub fn new(config: GossipConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    // ========================================================================
    // Set
    // ========================================================================

    /// Every value this node has learned, ascending.
    pub fn messages(&self) -> &BTreeSet<Value> {
        &self.messages
    }

    pub fn contains(&self, value: Value) -> bool {
        self.messages.contains(&value)
    }

    /// Adds `value`; returns `true` if it was new.
    pub fn insert(&mut self, value: Value) -> bool {
        self.messages.insert(value)
    }

    /// Unions `values` into the set; returns how many were new.
    pub fn merge(&mut self, values: impl IntoIterator<Item = Value>) -> usize {
        values.into_iter().filter(|v| self.messages.insert(*v)).count()
    }

    // ========================================================================
    // Neighbour knowledge
    // ========================================================================

    /// Values `neighbor` is believed to hold. `None` when nothing is tracked.
    pub fn known_by(&self, neighbor: &NodeId) -> Option<&BTreeSet<Value>> {
        self.known.get(neighbor)
    }

    /// Records that `neighbor` holds `values`. No-op when tracking is off.
    pub fn record_known<'a>(
        &mut self,
        neighbor: &NodeId,
        values: impl IntoIterator<Item = &'a Value>,
    ) {
        if !self.config.track_neighbors {
            return;
        }
        self.known
            .entry(neighbor.clone())
            .or_default()
            .extend(values);
    }

    /// Records `values` as known to `neighbor` right after sending them,
    /// before any sign that they arrived.
    ///
    /// Skipped when full syncs are off: a lost message would otherwise
    /// leave the entry wrong for good and the values would never be resent.
    pub fn record_sent<'a>(
        &mut self,
        neighbor: &NodeId,
        values: impl IntoIterator<Item = &'a Value>,
    ) {
        if self.config.full_sync_every == 0 {
            return;
        }
        self.record_known(neighbor, values);
    }

    /// Values to send `neighbor` this round.
    ///
    /// With tracking off, or on a full-sync round, that is the whole set.
    pub fn delta_for(&self, neighbor: &NodeId, full_sync: bool) -> Vec<Value> {
        match self.known.get(neighbor) {
            Some(known) if self.config.track_neighbors && !full_sync => {
                self.messages.difference(known).copied().collect()
            }
            _ => self.messages.iter().copied().collect(),
        }
    }

    // ========================================================================
    // Rounds
    // ========================================================================

    /// Starts a gossip round if the interval has elapsed since the last one.
    ///
    /// Returns `None` when it is too early, otherwise whether this round is
    /// a full sync.
    pub fn begin_round(&mut self, now_ns: u64) -> Option<bool> {
        let interval_ns = u64::try_from(self.config.interval.as_nanos()).unwrap_or(u64::MAX);
        if let Some(last) = self.last_round_ns
            && now_ns.saturating_sub(last) < interval_ns
        {
            return None;
        }

        self.last_round_ns = Some(now_ns);
        self.rounds += 1;
        let every = u64::from(self.config.full_sync_every);
        Some(every > 0 && self.rounds.is_multiple_of(every))
    }

    /// Gossip rounds started so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}
