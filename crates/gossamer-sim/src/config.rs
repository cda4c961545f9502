//! Simulation parameters and network counters.

/// Network fault model for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// RNG seed; the whole run is a function of it.
    pub seed: u64,
    /// Probability that an in-flight message is lost.
    pub drop_probability: f64,
    /// Probability that a delivered message is delivered again later.
    pub duplicate_probability: f64,
    /// Deliver in random order instead of send order.
    pub reorder: bool,
}

impl SimConfig {
    /// No loss, no duplication, random order.
    pub fn reliable(seed: u64) -> Self {
        Self {
            seed,
            drop_probability: 0.0,
            duplicate_probability: 0.0,
            reorder: true,
        }
    }

    /// Loses each message with probability `drop_probability`.
    pub fn lossy(seed: u64, drop_probability: f64) -> Self {
        Self {
            drop_probability,
            ..Self::reliable(seed)
        }
    }

    #[must_use]
    pub fn with_duplicates(mut self, duplicate_probability: f64) -> Self {
        self.duplicate_probability = duplicate_probability;
        self
    }

    /// Delivers strictly in send order.
    #[must_use]
    pub fn in_order(mut self) -> Self {
        self.reorder = false;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::reliable(0)
    }
}

/// What the simulated network did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Envelopes emitted by nodes and services.
    pub sent: u64,
    /// Envelopes handed to a node.
    pub delivered: u64,
    pub dropped: u64,
    pub duplicated: u64,
}
