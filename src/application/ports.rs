//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::hash::Hash;

/// Port for obtaining current wall-clock time.
///
/// Windows end at absolute timestamps that are reported to clients in the
/// `X-RateLimit-Reset` header, so the clock works in milliseconds since the
/// Unix epoch rather than monotonic instants.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Port for concurrent counter storage.
///
/// This abstraction allows the application layer to keep counters without
/// depending on a specific concurrent map. Infrastructure provides
/// `ShardedStorage`; a centralized store for multi-instance deployments can be
/// swapped in behind the same interface.
pub trait CounterStore<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// The lookup, the optional creation and the accessor must run as one
    /// atomic step for `key`: concurrent calls for the same key observe each
    /// other's writes in some serial order. Calls for different keys need no
    /// coordination.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Remove entries for which the predicate returns false.
    ///
    /// Implementations should not hold a lock over the whole store for the
    /// duration of the scan.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}
