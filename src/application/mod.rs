//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Counter registry (storage of fixed-window counters)
//! - Admission controller (decision making)
//! - Sweeper (periodic reclamation of expired counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod controller;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
