//! Per-site adaptive request pacing.
//!
//! Every fetch to a site flows through one shared [`RateLimiter`] handle,
//! which tracks, per site name, when the last request went out and whether
//! the site has pushed back (429/403). While a site is in backoff mode its
//! base delay is scaled up and only a streak of successes brings it back to
//! normal. This purely time-based throttle is how the engine self-limits
//! without external coordination.
//!
//! State is keyed by site name, created lazily on first use, and lives for
//! the process lifetime. There are no ambient globals: whoever needs pacing
//! holds a clone of the handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::rng::{RandomSource, XorShiftRandom};

/// Delay multiplier applied while a site is in backoff mode.
const BACKOFF_SCALE: f64 = 1.2;

/// Upper bound of the random jitter added to every required delay.
const MAX_JITTER: Duration = Duration::from_secs(4);

/// Consecutive successes needed to leave backoff mode.
const RECOVERY_STREAK: u32 = 3;

#[derive(Debug, Default)]
struct SiteState {
    last_request: Option<Instant>,
    consecutive_successes: u32,
    consecutive_failures: u32,
    backoff: bool,
}

/// Read-only view of one site's pacing state, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteStats {
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub backoff: bool,
}

/// Shared per-site rate limiter. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    states: Arc<Mutex<HashMap<String, SiteState>>>,
    rng: Arc<dyn RandomSource>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_rng(Arc::new(XorShiftRandom::new()))
    }

    /// Acquires the state lock, recovering from poison if necessary.
    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<String, SiteState>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovered from poisoned rate limiter mutex");
            poisoned.into_inner()
        })
    }

    /// Inject the random source so jitter is deterministic under test.
    pub fn with_rng(rng: Arc<dyn RandomSource>) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            rng,
        }
    }

    /// Block (async sleep) until a request to `site` is allowed, then stamp
    /// the request time. `base_delay` is the site's configured minimum gap.
    pub async fn acquire(&self, site: &str, base_delay: Duration) {
        let wait = {
            let mut states = self.lock_states();
            let state = states.entry(site.to_string()).or_default();

            let mut required = if state.backoff {
                base_delay.mul_f64(BACKOFF_SCALE)
            } else {
                base_delay
            };
            required += self.rng.jitter(MAX_JITTER);

            match state.last_request {
                Some(last) => required.saturating_sub(last.elapsed()),
                // First request to this site goes out immediately.
                None => Duration::ZERO,
            }
        };

        if !wait.is_zero() {
            tracing::debug!(site = %site, sleep_ms = %wait.as_millis(), "rate limiting request");
            tokio::time::sleep(wait).await;
        }

        let mut states = self.lock_states();
        if let Some(state) = states.get_mut(site) {
            state.last_request = Some(Instant::now());
        }
    }

    /// Record a 2xx outcome. A streak of successes ends backoff mode.
    pub fn record_success(&self, site: &str) {
        let mut states = self.lock_states();
        let state = states.entry(site.to_string()).or_default();
        state.consecutive_successes += 1;
        state.consecutive_failures = 0;
        if state.backoff && state.consecutive_successes >= RECOVERY_STREAK {
            tracing::info!(site = %site, "leaving backoff mode");
            state.backoff = false;
        }
    }

    /// Record a failed outcome. `blocking` (429/403) enters backoff mode.
    pub fn record_failure(&self, site: &str, blocking: bool) {
        let mut states = self.lock_states();
        let state = states.entry(site.to_string()).or_default();
        state.consecutive_failures += 1;
        state.consecutive_successes = 0;
        if blocking && !state.backoff {
            tracing::warn!(site = %site, "entering backoff mode");
            state.backoff = true;
        }
    }

    /// Pacing counters for a site, if it has been seen.
    pub fn snapshot(&self, site: &str) -> Option<SiteStats> {
        let states = self.lock_states();
        states.get(site).map(|s| SiteStats {
            consecutive_successes: s.consecutive_successes,
            consecutive_failures: s.consecutive_failures,
            backoff: s.backoff,
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
