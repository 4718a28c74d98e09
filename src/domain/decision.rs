//! Admission decisions.

/// Outcome of a single admission check.
///
/// Carries the quota state a caller needs to render rate-limit headers. A
/// decision is derived per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Policy limit for the window
    pub limit: u64,
    /// Admissions left in the current window
    pub remaining: u64,
    /// End of the current window, in milliseconds since the Unix epoch
    pub reset_at: u64,
    /// Seconds until the window resets; only set on rejection
    pub retry_after_secs: Option<u64>,
}

impl Decision {
    /// Build an admitted decision.
    pub fn admitted(limit: u64, remaining: u64, reset_at: u64) -> Self {
        Self {
            admitted: true,
            limit,
            remaining,
            reset_at,
            retry_after_secs: None,
        }
    }

    /// Build a rejected decision. `remaining` is always zero.
    pub fn rejected(limit: u64, reset_at: u64, retry_after_secs: u64) -> Self {
        Self {
            admitted: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after_secs: Some(retry_after_secs),
        }
    }

    /// Check if the request was admitted.
    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    /// Check if the request was rejected.
    pub fn is_rejected(&self) -> bool {
        !self.admitted
    }

    /// Window end in epoch seconds, rounded up.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at.div_ceil(1000)
    }
}
