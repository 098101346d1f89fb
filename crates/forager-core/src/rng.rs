//! Injectable randomness for jitter, shuffling, and cookie forging.
//!
//! Fetch and backoff timing must be reproducible under test, so every
//! component that needs randomness takes a [`RandomSource`] handle instead
//! of calling into an ambient generator. The default is a lock-free
//! xorshift64 seeded from the clock — good enough for pacing jitter and
//! synthetic cookie values, not crypto, and it keeps the `rand` crate out
//! of the dependency tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Source of pseudo-random values. `&self` methods so a single handle can
/// be shared across tasks.
pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;

    /// Uniform-ish value in `[0, bound)`; 0 when `bound` is 0.
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 { 0 } else { self.next_u64() % bound }
    }

    /// Random duration in `[0, max)`, millisecond granularity.
    fn jitter(&self, max: Duration) -> Duration {
        Duration::from_millis(self.below(max.as_millis() as u64))
    }
}

/// xorshift64 over an atomic word.
#[derive(Debug)]
pub struct XorShiftRandom {
    state: AtomicU64,
}

impl XorShiftRandom {
    /// Seed from the high-resolution clock.
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::seeded(seed)
    }

    /// Fixed seed for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        // xorshift has a fixed point at zero.
        let seed = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self {
            state: AtomicU64::new(seed),
        }
    }
}

impl Default for XorShiftRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for XorShiftRandom {
    fn next_u64(&self) -> u64 {
        // Relaxed load/store: a lost update under contention just repeats a
        // jitter value, which is acceptable here.
        let mut x = self.state.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.store(x, Ordering::Relaxed);
        x
    }
}

/// Test double that always returns the same value (so `below` and
/// `jitter` are fully deterministic).
#[derive(Debug)]
pub struct FixedRandom(pub u64);

impl RandomSource for FixedRandom {
    fn next_u64(&self) -> u64 {
        self.0
    }
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T>(items: &mut [T], rng: &dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        items.swap(i, j);
    }
}

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Random alphanumeric string, used to forge session-cookie values.
pub fn random_string(rng: &dyn RandomSource, len: usize) -> String {
    (0..len)
        .map(|_| ALPHANUMERIC[rng.below(ALPHANUMERIC.len() as u64) as usize] as char)
        .collect()
}
