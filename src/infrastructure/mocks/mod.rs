//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of application logic.

pub mod capture;
pub mod clock;

pub use capture::{CapturedEvent, MockCaptureLayer};
pub use clock::MockClock;
