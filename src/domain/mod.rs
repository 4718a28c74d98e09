//! Domain layer - pure admission logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of admission control:
//! - Named policies and the policy catalog
//! - Fixed-window counters and their transition rules
//! - Admission decisions
//!
//! Nothing here reads a clock or touches shared state; callers pass `now` in.

pub mod catalog;
pub mod counter;
pub mod decision;
pub mod policy;
