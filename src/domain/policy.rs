//! Admission policies.
//!
//! A policy names one class of endpoint and fixes how many requests a single
//! identity may make against it per window.

use std::time::Duration;

/// Error returned when a policy definition is invalid.
///
/// Policies are validated once at startup. A policy that fails validation must
/// never serve traffic, so these errors surface from constructors only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Policy name must not be empty
    EmptyName,
    /// Limit must be greater than zero
    ZeroLimit {
        /// Name of the offending policy
        name: String,
    },
    /// Window must be at least one millisecond
    ZeroWindow {
        /// Name of the offending policy
        name: String,
    },
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::EmptyName => write!(f, "policy name must not be empty"),
            PolicyError::ZeroLimit { name } => {
                write!(f, "policy '{}': limit must be greater than 0", name)
            }
            PolicyError::ZeroWindow { name } => {
                write!(f, "policy '{}': window must be at least 1ms", name)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// A named fixed-window admission policy.
///
/// # Example
/// ```
/// use admission_control::Policy;
/// use std::time::Duration;
///
/// let policy = Policy::new("search", 30, Duration::from_secs(60)).unwrap();
/// assert_eq!(policy.limit(), 30);
/// assert_eq!(policy.window_ms(), 60_000);
/// assert_eq!(policy.counter_key("1.2.3.4"), "search:1.2.3.4");
///
/// assert!(Policy::new("search", 0, Duration::from_secs(60)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: String,
    limit: u64,
    window_ms: u64,
    key_prefix: String,
}

impl Policy {
    /// Create a validated policy.
    ///
    /// The key prefix defaults to `"<name>:"`.
    ///
    /// # Errors
    /// Returns `PolicyError` if the name is empty, `limit` is zero, or the
    /// window is shorter than one millisecond.
    pub fn new(name: impl Into<String>, limit: u64, window: Duration) -> Result<Self, PolicyError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        Self::from_millis(name, limit, window_ms)
    }

    /// Create a validated policy from a window expressed in milliseconds.
    ///
    /// # Errors
    /// Same as [`Policy::new`].
    pub fn from_millis(
        name: impl Into<String>,
        limit: u64,
        window_ms: u64,
    ) -> Result<Self, PolicyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PolicyError::EmptyName);
        }
        if limit == 0 {
            return Err(PolicyError::ZeroLimit { name });
        }
        if window_ms == 0 {
            return Err(PolicyError::ZeroWindow { name });
        }

        let key_prefix = format!("{}:", name);
        Ok(Self {
            name,
            limit,
            window_ms,
            key_prefix,
        })
    }

    /// Replace the counter namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Policy name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum admissions per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Namespace prepended to every identity counted under this policy.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Composite store key for an identity under this policy.
    pub fn counter_key(&self, identity: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + identity.len());
        key.push_str(&self.key_prefix);
        key.push_str(identity);
        key
    }
}
