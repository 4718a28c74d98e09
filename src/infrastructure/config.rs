//! Boot-time configuration.
//!
//! Hosts may source policy limits from a TOML document at startup instead of
//! the built-in presets:
//!
//! ```toml
//! sweep_interval_secs = 60
//!
//! [[policies]]
//! name = "search"
//! limit = 50
//! window_ms = 60000
//!
//! [[policies]]
//! name = "webhooks"
//! limit = 300
//! window_ms = 60000
//! key_prefix = "wh:"
//! ```
//!
//! Every entry is validated when the catalog is built; an invalid entry stops
//! startup rather than leaving an endpoint unguarded.

use crate::application::sweeper::{SweeperConfig, SweeperConfigError, DEFAULT_SWEEP_INTERVAL};
use crate::domain::catalog::{CatalogError, PolicyCatalog};
use crate::domain::policy::{Policy, PolicyError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Error returned when configuration cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid TOML or has the wrong shape
    Parse(toml::de::Error),
    /// A policy entry is invalid
    Policy(PolicyError),
    /// Policy entries conflict with each other or with presets
    Catalog(CatalogError),
    /// Sweep interval must be greater than zero
    ZeroSweepInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid admission config: {}", e),
            ConfigError::Policy(e) => write!(f, "invalid policy: {}", e),
            ConfigError::Catalog(e) => write!(f, "invalid policy catalog: {}", e),
            ConfigError::ZeroSweepInterval => write!(f, "sweep_interval_secs must be greater than 0"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Policy(e) => Some(e),
            ConfigError::Catalog(e) => Some(e),
            ConfigError::ZeroSweepInterval => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<PolicyError> for ConfigError {
    fn from(e: PolicyError) -> Self {
        ConfigError::Policy(e)
    }
}

impl From<CatalogError> for ConfigError {
    fn from(e: CatalogError) -> Self {
        ConfigError::Catalog(e)
    }
}

impl From<SweeperConfigError> for ConfigError {
    fn from(e: SweeperConfigError) -> Self {
        match e {
            SweeperConfigError::ZeroSweepInterval => ConfigError::ZeroSweepInterval,
        }
    }
}

/// One policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Policy name, unique within the catalog
    pub name: String,
    /// Maximum admissions per window
    pub limit: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Counter namespace; defaults to `"<name>:"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

impl PolicyConfig {
    /// Validate into a policy.
    ///
    /// # Errors
    /// Returns `PolicyError` for an empty name, zero limit or zero window.
    pub fn to_policy(&self) -> Result<Policy, PolicyError> {
        let policy = Policy::from_millis(self.name.clone(), self.limit, self.window_ms)?;
        Ok(match &self.key_prefix {
            Some(prefix) => policy.with_key_prefix(prefix.clone()),
            None => policy,
        })
    }
}

/// Admission configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmissionConfig {
    /// Seconds between sweeps of expired counters
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Start from the marketplace presets and let entries override them
    #[serde(default = "default_merge_with_presets")]
    pub merge_with_presets: bool,
    /// Policy entries
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_merge_with_presets() -> bool {
    true
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            merge_with_presets: default_merge_with_presets(),
            policies: Vec::new(),
        }
    }
}

impl AdmissionConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the document is malformed. Values are
    /// validated later by [`AdmissionConfig::into_catalog`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Build the policy catalog.
    ///
    /// With `merge_with_presets`, entries replace presets of the same name and
    /// add new ones; otherwise only the configured entries exist.
    ///
    /// # Errors
    /// Returns `ConfigError` for the first invalid or conflicting entry.
    pub fn into_catalog(&self) -> Result<PolicyCatalog, ConfigError> {
        let mut catalog = if self.merge_with_presets {
            PolicyCatalog::marketplace()?
        } else {
            PolicyCatalog::new()
        };

        for entry in &self.policies {
            let policy = entry.to_policy()?;
            if self.merge_with_presets {
                catalog.upsert(policy)?;
            } else {
                catalog.insert(policy)?;
            }
        }

        tracing::info!(
            policies = catalog.len(),
            configured = self.policies.len(),
            "admission policies loaded"
        );
        Ok(catalog)
    }

    /// Sweeper settings from this document.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroSweepInterval` if the interval is zero.
    pub fn sweeper_config(&self) -> Result<SweeperConfig, ConfigError> {
        Ok(SweeperConfig::new(Duration::from_secs(self.sweep_interval_secs))?)
    }
}
