//! Per-identity sliding-window admission control.
//!
//! Process-local and best-effort: the limiter's job is abuse mitigation,
//! not a distributed correctness guarantee. Windows are pruned lazily on
//! the identity being checked; a low-probability global sweep bounds
//! growth of the identity map without a dedicated timer task.

use std::time::Instant;

use dashmap::DashMap;
use rand::Rng;
use tracing::{debug, trace};

use crate::config::RateLimitConfig;

/// Probability that any single admission check also sweeps the whole map.
const CLEANUP_PROBABILITY: f64 = 0.01;

/// Sliding-window rate limiter keyed by caller identity.
pub struct RateLimiter {
    windows: DashMap<String, Vec<Instant>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter with the given window parameters.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    /// Check and record one attempt for `identity`.
    ///
    /// Prunes the identity's window, rejects if the pruned window is at
    /// capacity, and otherwise records the attempt. Rejected attempts are
    /// not recorded.
    pub fn is_admitted(&self, identity: &str) -> bool {
        if rand::rng().random::<f64>() < CLEANUP_PROBABILITY {
            self.sweep();
        }

        let now = Instant::now();
        let mut window = self.windows.entry(identity.to_string()).or_default();
        window.retain(|t| now.duration_since(*t) < self.config.window);

        if window.len() >= self.config.max_attempts {
            trace!(identity, attempts = window.len(), "admission rejected");
            return false;
        }

        window.push(now);
        true
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Prune every window and drop identities whose windows emptied.
    fn sweep(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < self.config.window);
            !timestamps.is_empty()
        });
        let dropped = before.saturating_sub(self.windows.len());
        if dropped > 0 {
            debug!(dropped, remaining = self.windows.len(), "rate limit map swept");
        }
    }
}
