//! Injectable randomness.
//!
//! Everything random in the simulation (unread counts in mock data, auto-reply
//! chance and delay, canned reply choice, typing chance) goes through
//! [`RandomSource`] so tests can pin the outcomes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub trait RandomSource: Send {
    /// A value in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// True with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    /// An index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        let i = (self.unit() * len as f64) as usize;
        i.min(len.saturating_sub(1))
    }

    /// A duration in `[min, max)`; `min` when the range is empty.
    fn duration_between(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        min + (max - min).mul_f64(self.unit())
    }
}

/// `rand`-backed source used outside of tests.
pub struct StdRandom(StdRng);

impl StdRandom {
    pub fn from_entropy() -> Self {
        StdRandom(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        StdRandom(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for StdRandom {
    fn unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}
