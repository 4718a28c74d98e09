//! Admission controller.
//!
//! The controller answers, for a caller identity and a policy, whether the
//! current request may proceed, and reports the quota state needed for
//! rate-limit response headers.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, CounterStore};
use crate::application::registry::CounterRegistry;
use crate::domain::catalog::{CatalogError, PolicyCatalog};
use crate::domain::{counter::CounterEntry, decision::Decision, policy::Policy};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;

/// Identity used when the caller could not determine one.
///
/// All such requests share one counter per policy.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Default in-memory counter store.
pub type DefaultStore = Arc<ShardedStorage<String, CounterEntry>>;

/// Fixed-window admission controller.
///
/// Cloning is cheap; clones share counters and metrics. Separately constructed
/// controllers are fully independent.
///
/// # Example
/// ```
/// use admission_control::{AdmissionController, Policy};
///
/// let controller = AdmissionController::new();
/// let policy = Policy::from_millis("auth", 2, 60_000).unwrap();
///
/// assert!(controller.check_admission("1.2.3.4", &policy).admitted);
/// assert!(controller.check_admission("1.2.3.4", &policy).admitted);
///
/// let decision = controller.check_admission("1.2.3.4", &policy);
/// assert!(!decision.admitted);
/// assert!(decision.retry_after_secs.unwrap() > 0);
/// ```
#[derive(Clone)]
pub struct AdmissionController<S = DefaultStore>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    registry: CounterRegistry<S>,
    metrics: Metrics,
}

impl AdmissionController<DefaultStore> {
    /// Create a controller with an empty in-memory store and the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a controller with an empty in-memory store and a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_store(Arc::new(ShardedStorage::new()), clock)
    }
}

impl Default for AdmissionController<DefaultStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> AdmissionController<S>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    /// Create a controller over a custom counter store.
    pub fn with_store(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: CounterRegistry::new(storage, clock),
            metrics: Metrics::new(),
        }
    }

    /// Decide whether a request from `identity` may proceed under `policy`.
    ///
    /// Never fails: a rejection is a normal `Decision` with `admitted = false`.
    /// An empty identity is counted under [`UNKNOWN_IDENTITY`].
    ///
    /// Exactly one counter is created or updated per call. The update is
    /// atomic per (policy, identity), so concurrent calls never lose counts.
    pub fn check_admission(&self, identity: &str, policy: &Policy) -> Decision {
        let identity = normalize_identity(identity);
        let key = policy.counter_key(identity);

        let decision = self
            .registry
            .with_counter(key, policy, |entry, now| entry.register(now, policy));

        if decision.admitted {
            self.metrics.record_admitted();
        } else {
            self.metrics.record_rejected();
            tracing::debug!(
                policy = policy.name(),
                identity,
                limit = decision.limit,
                retry_after_secs = decision.retry_after_secs.unwrap_or_default(),
                "admission rejected"
            );
        }

        decision
    }

    /// Check admission under the catalog policy called `name`.
    ///
    /// # Errors
    /// Returns `CatalogError::UnknownPolicy` if the catalog has no such policy.
    /// No counter is touched in that case.
    pub fn check_named(
        &self,
        identity: &str,
        catalog: &PolicyCatalog,
        name: &str,
    ) -> Result<Decision, CatalogError> {
        let policy = catalog.require(name)?;
        Ok(self.check_admission(identity, policy))
    }

    /// Remove every counter whose window has passed.
    ///
    /// Only reclaims memory: a removed counter and an expired counter that is
    /// still present produce the same decision on the next request.
    ///
    /// Returns the number of counters removed.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.registry.remove_expired();
        if removed > 0 {
            self.metrics.record_swept(removed);
            tracing::trace!(
                removed,
                remaining = self.registry.len(),
                "swept expired counters"
            );
        }
        removed
    }

    /// Number of live counters.
    pub fn counter_count(&self) -> usize {
        self.registry.len()
    }

    /// Drop all counters, restoring every quota.
    pub fn reset(&self) {
        self.registry.clear();
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &CounterRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Blank identities share the fallback bucket; anything else is used verbatim.
fn normalize_identity(identity: &str) -> &str {
    if identity.trim().is_empty() {
        UNKNOWN_IDENTITY
    } else {
        identity
    }
}
