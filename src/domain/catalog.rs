//! Named policy presets.
//!
//! The catalog maps endpoint classes to policies. It is built once at startup;
//! the admission controller never interprets policy names.

use crate::domain::policy::{Policy, PolicyError};
use std::collections::BTreeMap;
use std::time::Duration;

/// Preset name for general API traffic.
pub const GENERAL: &str = "general";
/// Preset name for booking creation.
pub const BOOKING: &str = "booking";
/// Preset name for promo-code validation.
pub const PROMO: &str = "promo";
/// Preset name for authentication attempts.
pub const AUTH: &str = "auth";
/// Preset name for partner and agency API traffic.
pub const AGENCY: &str = "agency";
/// Preset name for live-location tracking updates.
pub const TRACKING: &str = "tracking";
/// Preset name for ride search.
pub const SEARCH: &str = "search";

const MINUTE: Duration = Duration::from_secs(60);
const QUARTER_HOUR: Duration = Duration::from_secs(15 * 60);

/// Error returned when a catalog lookup or insertion fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A policy with this name is already registered
    DuplicatePolicy(String),
    /// Another policy already uses this key prefix
    DuplicateKeyPrefix {
        /// The shared prefix
        prefix: String,
        /// Policy that registered the prefix first
        existing: String,
    },
    /// The key prefix starts with another policy's prefix, or the other way
    /// round, so some identities would map to the same counter key
    OverlappingKeyPrefix {
        /// Prefix of the policy being registered
        prefix: String,
        /// Policy whose prefix overlaps
        existing: String,
        /// Prefix of that policy
        existing_prefix: String,
    },
    /// No policy with this name exists
    UnknownPolicy(String),
    /// A preset failed validation
    Policy(PolicyError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::DuplicatePolicy(name) => {
                write!(f, "policy '{}' is already registered", name)
            }
            CatalogError::DuplicateKeyPrefix { prefix, existing } => {
                write!(
                    f,
                    "key prefix '{}' is already used by policy '{}'",
                    prefix, existing
                )
            }
            CatalogError::OverlappingKeyPrefix {
                prefix,
                existing,
                existing_prefix,
            } => {
                write!(
                    f,
                    "key prefix '{}' overlaps prefix '{}' of policy '{}'",
                    prefix, existing_prefix, existing
                )
            }
            CatalogError::UnknownPolicy(name) => write!(f, "unknown policy '{}'", name),
            CatalogError::Policy(e) => write!(f, "invalid policy: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Policy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PolicyError> for CatalogError {
    fn from(e: PolicyError) -> Self {
        CatalogError::Policy(e)
    }
}

/// Immutable-after-startup table of named policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    policies: BTreeMap<String, Policy>,
}

impl PolicyCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The marketplace presets.
    ///
    /// | name       | limit | window |
    /// |------------|-------|--------|
    /// | `general`  | 100   | 15 min |
    /// | `booking`  | 10    | 1 min  |
    /// | `promo`    | 20    | 15 min |
    /// | `auth`     | 5     | 15 min |
    /// | `agency`   | 100   | 1 min  |
    /// | `tracking` | 120   | 1 min  |
    /// | `search`   | 30    | 1 min  |
    pub fn marketplace() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for (name, limit, window) in [
            (GENERAL, 100, QUARTER_HOUR),
            (BOOKING, 10, MINUTE),
            (PROMO, 20, QUARTER_HOUR),
            (AUTH, 5, QUARTER_HOUR),
            (AGENCY, 100, MINUTE),
            (TRACKING, 120, MINUTE),
            (SEARCH, 30, MINUTE),
        ] {
            catalog.insert(Policy::new(name, limit, window)?)?;
        }
        Ok(catalog)
    }

    /// Register a policy.
    ///
    /// # Errors
    /// Returns `CatalogError` if the name or key prefix is already taken.
    pub fn insert(&mut self, policy: Policy) -> Result<(), CatalogError> {
        if self.policies.contains_key(policy.name()) {
            return Err(CatalogError::DuplicatePolicy(policy.name().to_string()));
        }
        self.check_prefix(&policy, None)?;
        self.policies.insert(policy.name().to_string(), policy);
        Ok(())
    }

    /// Register a policy, replacing any existing policy with the same name.
    ///
    /// Returns the replaced policy.
    ///
    /// # Errors
    /// Returns `CatalogError::DuplicateKeyPrefix` if a differently named
    /// policy already uses the key prefix.
    pub fn upsert(&mut self, policy: Policy) -> Result<Option<Policy>, CatalogError> {
        self.check_prefix(&policy, Some(policy.name()))?;
        Ok(self.policies.insert(policy.name().to_string(), policy))
    }

    fn check_prefix(&self, policy: &Policy, replacing: Option<&str>) -> Result<(), CatalogError> {
        let prefix = policy.key_prefix();
        let clash = self.policies.values().find(|existing| {
            Some(existing.name()) != replacing
                && (existing.key_prefix().starts_with(prefix)
                    || prefix.starts_with(existing.key_prefix()))
        });
        match clash {
            Some(existing) if existing.key_prefix() == prefix => {
                Err(CatalogError::DuplicateKeyPrefix {
                    prefix: prefix.to_string(),
                    existing: existing.name().to_string(),
                })
            }
            // `prefix + identity` is only unambiguous when no prefix extends another
            Some(existing) => Err(CatalogError::OverlappingKeyPrefix {
                prefix: prefix.to_string(),
                existing: existing.name().to_string(),
                existing_prefix: existing.key_prefix().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    /// Look up a policy by name, failing if it is missing.
    ///
    /// # Errors
    /// Returns `CatalogError::UnknownPolicy` if no policy has this name.
    pub fn require(&self, name: &str) -> Result<&Policy, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownPolicy(name.to_string()))
    }

    /// Iterate over policies in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
