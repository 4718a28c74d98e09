//! Fixed-window counters.
//!
//! One `CounterEntry` exists per (policy, identity) pair. The window boundary
//! is fixed by the request that opens it and is never recomputed by later
//! requests in the same window. Consequently up to twice the limit can be
//! admitted across a window boundary; that behavior is intentional and callers
//! rely on it matching a plain fixed-window counter.

use crate::domain::decision::Decision;
use crate::domain::policy::Policy;

/// Counter state for one identity under one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Requests counted in the current window, including rejected ones
    pub count: u64,
    /// Window end, in milliseconds since the Unix epoch
    pub reset_at: u64,
}

impl CounterEntry {
    /// Open a fresh window at `now` with no requests counted yet.
    ///
    /// The first `register` call on this entry counts as the window's first
    /// request.
    pub fn open(now: u64, policy: &Policy) -> Self {
        Self {
            count: 0,
            reset_at: now.saturating_add(policy.window_ms()),
        }
    }

    /// Whether the window has ended and the next request starts a new one.
    pub fn is_expired(&self, now: u64) -> bool {
        self.reset_at <= now
    }

    /// Whether the sweep may drop this entry.
    pub fn is_reclaimable(&self, now: u64) -> bool {
        self.reset_at < now
    }

    /// Count one request at `now` and decide whether to admit it.
    ///
    /// # Example
    /// ```
    /// use admission_control::{CounterEntry, Policy};
    ///
    /// let policy = Policy::from_millis("search", 2, 60_000).unwrap();
    /// let mut entry = CounterEntry::open(0, &policy);
    ///
    /// assert_eq!(entry.register(0, &policy).remaining, 1);
    /// assert_eq!(entry.register(0, &policy).remaining, 0);
    ///
    /// let rejected = entry.register(0, &policy);
    /// assert!(rejected.is_rejected());
    /// assert_eq!(rejected.retry_after_secs, Some(60));
    /// ```
    pub fn register(&mut self, now: u64, policy: &Policy) -> Decision {
        let limit = policy.limit();

        if self.count == 0 || self.is_expired(now) {
            self.count = 1;
            self.reset_at = now.saturating_add(policy.window_ms());
            return Decision::admitted(limit, limit - 1, self.reset_at);
        }

        self.count = self.count.saturating_add(1);
        if self.count > limit {
            let retry_after_secs = (self.reset_at - now).div_ceil(1000);
            Decision::rejected(limit, self.reset_at, retry_after_secs)
        } else {
            Decision::admitted(limit, limit - self.count, self.reset_at)
        }
    }
}
