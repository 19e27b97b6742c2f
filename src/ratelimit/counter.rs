//! Fixed-window counter state.
//!
//! A window opens on the first request for a key and closes `window` later.
//! Counts reset only when a request arrives after the window has closed,
//! so a caller can burst up to twice the quota across a boundary: the full
//! quota at the end of one window and again at the start of the next.

use super::decision::{retry_after_secs, Decision};
use super::policy::RateLimitConfig;

/// Request count and reset time for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Admitted requests in the current window
    pub count: u64,
    /// When the current window closes, in epoch milliseconds
    pub reset_at_ms: u64,
}

impl CounterEntry {
    /// Open a new window with the first request already counted.
    pub fn open(now_ms: u64, config: &RateLimitConfig) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(config.window_ms()),
        }
    }

    /// A window is expired once `now` is strictly past its reset time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.reset_at_ms < now_ms
    }

    /// Count one request against this entry and decide whether it may pass.
    ///
    /// Denied requests leave the entry untouched.
    pub fn admit(&mut self, now_ms: u64, config: &RateLimitConfig) -> Decision {
        let limit = config.max_requests();

        if self.is_expired(now_ms) {
            *self = Self::open(now_ms, config);
            return Decision::allowed(limit, limit - 1, self.reset_at_ms);
        }

        if self.count < limit {
            self.count += 1;
            return Decision::allowed(limit, limit - self.count, self.reset_at_ms);
        }

        let retry_after = retry_after_secs(self.reset_at_ms, now_ms);
        Decision::denied(
            limit,
            self.reset_at_ms,
            retry_after,
            config.denial_message(retry_after),
        )
    }
}

/// Admit a request for a key that has no entry yet.
pub fn admit_first(now_ms: u64, config: &RateLimitConfig) -> (CounterEntry, Decision) {
    let entry = CounterEntry::open(now_ms, config);
    let limit = config.max_requests();
    (entry, Decision::allowed(limit, limit - 1, entry.reset_at_ms))
}
