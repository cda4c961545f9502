//! Seeded randomness for fault injection and delivery order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic RNG. Two instances with the same seed yield the same stream.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `true` with the given probability. Values outside `[0, 1]`
    /// are clamped.
    #[inline]
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        self.inner.gen_bool(probability.min(1.0))
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index range must be non-empty");
        self.inner.gen_range(0..len)
    }
}
