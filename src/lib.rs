//! # admission-control
//!
//! Fixed-window request admission for the transfer marketplace API.
//!
//! Each request carries a caller identity (a client IP, an API key) and is
//! checked against a named policy: at most `limit` requests per identity in
//! each window of `window_ms` milliseconds. Over-limit requests are rejected
//! with a retry hint and never reach business logic.
//!
//! ## Quick Start
//!
//! ```rust
//! use admission_control::{AdmissionController, PolicyCatalog};
//!
//! let catalog = PolicyCatalog::marketplace().unwrap();
//! let controller = AdmissionController::new();
//!
//! let decision = controller
//!     .check_named("203.0.113.7", &catalog, "auth")
//!     .unwrap();
//! assert!(decision.admitted);
//! assert_eq!(decision.limit, 5);
//! assert_eq!(decision.remaining, 4);
//! ```
//!
//! ## HTTP Integration
//!
//! [`AdmissionLayer`] is a `tower::Layer`, so it wraps axum routers and any
//! other tower service over `http` types:
//!
//! ```rust,no_run
//! use admission_control::{AdmissionController, AdmissionLayer, PolicyCatalog};
//! use axum::{routing::{get, post}, Router};
//!
//! let catalog = PolicyCatalog::marketplace().unwrap();
//! let controller = AdmissionController::new();
//!
//! let bookings = AdmissionLayer::with_controller(
//!     controller.clone(),
//!     catalog.require("booking").unwrap().clone(),
//! );
//! let search = AdmissionLayer::with_controller(
//!     controller.clone(),
//!     catalog.require("search").unwrap().clone(),
//! );
//!
//! let app: Router = Router::new()
//!     .route("/bookings", post(|| async { "created" }).layer(bookings))
//!     .route("/search", get(|| async { "[]" }).layer(search));
//! ```
//!
//! Admitted responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset`. Rejected requests get `429 Too Many Requests` with a
//! `Retry-After` header and a JSON body:
//!
//! ```json
//! {"error":"Too Many Requests","message":"Rate limit exceeded. Please try again in 42 seconds.","retryAfter":42}
//! ```
//!
//! ## Policies
//!
//! | Policy | Limit | Window |
//! |--------|-------|--------|
//! | `general` | 100 | 15 min |
//! | `booking` | 10 | 1 min |
//! | `promo` | 20 | 15 min |
//! | `auth` | 5 | 15 min |
//! | `agency` | 100 | 1 min |
//! | `tracking` | 120 | 1 min |
//! | `search` | 30 | 1 min |
//!
//! Limits can be overridden at boot from TOML with [`AdmissionConfig`].
//!
//! ## Window Semantics
//!
//! Windows are fixed, not sliding. A window opens on the first request of an
//! identity and closes `window_ms` later; the next request after that starts
//! a fresh window. A caller can therefore get up to `2 * limit` requests
//! through around a boundary.
//!
//! ## Memory
//!
//! Counters for identities that went quiet are reclaimed by a [`Sweeper`]:
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() {
//! use admission_control::{AdmissionController, Sweeper, SweeperConfig};
//!
//! let controller = AdmissionController::new();
//! let handle = Sweeper::new(controller.clone(), SweeperConfig::default()).start();
//!
//! // ... serve traffic ...
//!
//! handle.shutdown().await.unwrap();
//! # }
//! ```
//!
//! ## Observability
//!
//! ```rust
//! use admission_control::{AdmissionController, Policy};
//!
//! let controller = AdmissionController::new();
//! let policy = Policy::from_millis("auth", 1, 60_000).unwrap();
//! controller.check_admission("1.2.3.4", &policy);
//! controller.check_admission("1.2.3.4", &policy);
//!
//! let snapshot = controller.metrics().snapshot();
//! assert_eq!(snapshot.requests_admitted, 1);
//! assert_eq!(snapshot.requests_rejected, 1);
//! println!("Rejection rate: {:.2}%", snapshot.rejection_rate() * 100.0);
//! ```
//!
//! Rejections are logged with `tracing` at debug level under this crate's
//! target.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    catalog::{CatalogError, PolicyCatalog},
    counter::CounterEntry,
    decision::Decision,
    policy::{Policy, PolicyError},
};

pub use application::{
    controller::{AdmissionController, DefaultStore, UNKNOWN_IDENTITY},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, CounterStore},
    registry::CounterRegistry,
    sweeper::{Sweeper, SweeperConfig, SweeperConfigError, DEFAULT_SWEEP_INTERVAL},
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweeperHandle};

pub use infrastructure::{
    clock::SystemClock,
    config::{AdmissionConfig, ConfigError, PolicyConfig},
    identity::{ApiKeyExtractor, ForwardedIpExtractor, IdentityExtractor},
    layer::{AdmissionLayer, AdmissionLayerBuilder, AdmissionService, BuildError},
    response::{too_many_requests, RateLimitHeaders, RejectionBody},
    storage::ShardedStorage,
};
