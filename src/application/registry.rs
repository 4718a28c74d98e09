//! Central registry for fixed-window counters.
//!
//! The registry owns the counter store and the clock. It hands out counters
//! one key at a time and reclaims the ones whose window has passed.

use crate::application::ports::{Clock, CounterStore};
use crate::domain::{counter::CounterEntry, policy::Policy};
use std::sync::Arc;

/// Registry managing all counter state.
///
/// This type is generic over the storage implementation, allowing different
/// storage backends to be used. In production, use `Arc<ShardedStorage>`.
/// Clones share the same store.
#[derive(Clone)]
pub struct CounterRegistry<S>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> CounterRegistry<S>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    /// Create a new registry with storage and a clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access or create the counter for a key with a callback.
    ///
    /// `now` is read once before the lookup. A missing counter is created with
    /// a window opened at `now` under `policy`. The callback runs while the
    /// store holds the key, so the read-modify-write is atomic per key.
    pub fn with_counter<F, R>(&self, key: String, policy: &Policy, f: F) -> R
    where
        F: FnOnce(&mut CounterEntry, u64) -> R,
    {
        let now = self.clock.now_millis();
        self.storage.with_entry_mut(
            key,
            || CounterEntry::open(now, policy),
            |entry| f(entry, now),
        )
    }

    /// Remove every counter whose window ended before now.
    ///
    /// Returns the number of counters removed.
    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.storage.retain(|_, entry| {
            let keep = !entry.is_reclaimable(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Current time according to the registry's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Get the number of tracked counters.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }
}
