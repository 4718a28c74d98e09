//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of window expiry and sweeping.
///
/// # Examples
///
/// ```
/// use admission_control::infrastructure::mocks::MockClock;
/// use admission_control::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(0);
/// assert_eq!(clock.now_millis(), 0);
///
/// // Advance time explicitly
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now_millis(), 10_000);
///
/// // Or set to a specific timestamp
/// clock.set(61_000);
/// assert_eq!(clock.now_millis(), 61_000);
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_millis: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock starting at `start_millis` since the Unix epoch.
    pub fn new(start_millis: u64) -> Self {
        Self {
            current_millis: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.advance_millis(millis);
    }

    /// Advance the clock by a number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.current_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the clock to a specific timestamp.
    pub fn set(&self, millis: u64) {
        self.current_millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.current_millis.load(Ordering::SeqCst)
    }
}
