//! Time sources.
//!
//! The runtime stamps the current time onto the context before running
//! hooks. Handlers and hooks never read a clock themselves.

use std::time::{Duration, Instant};

/// A monotonic time source in nanoseconds.
pub trait Clock {
    /// Nanoseconds since an arbitrary, fixed origin.
    fn now_ns(&self) -> u64;
}

/// Production clock backed by [`Instant`].
///
/// The origin is the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Clock that only moves when told to. Used by tests and simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualClock {
    now_ns: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now_ns = self.now_ns.saturating_add(by.as_nanos() as u64);
    }

    pub fn set(&mut self, now_ns: u64) {
        self.now_ns = now_ns;
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns
    }
}
