//! Integration tests for the background sweeper lifecycle.

#![cfg(feature = "async")]

mod common;

use admission_control::{AdmissionController, Policy, Sweeper, SweeperConfig};
use common::ManualClock;
use std::sync::Arc;
use std::time::Duration;

fn populated(clock: &ManualClock, callers: usize) -> (AdmissionController, Policy) {
    let controller = AdmissionController::with_clock(Arc::new(clock.clone()));
    let policy = Policy::from_millis("tracking", 120, 60_000).unwrap();
    for i in 0..callers {
        controller.check_admission(&format!("driver-{}", i), &policy);
    }
    (controller, policy)
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_reclaims_quiet_callers() {
    let clock = ManualClock::at(0);
    let (controller, policy) = populated(&clock, 25);
    let config = SweeperConfig::new(Duration::from_secs(60)).unwrap();
    let handle = Sweeper::new(controller.clone(), config).start();

    // One active caller keeps its window open
    clock.set(61_000);
    controller.check_admission("driver-active", &policy);

    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::task::yield_now().await;

    assert_eq!(controller.counter_count(), 1);
    assert_eq!(controller.metrics().entries_swept(), 25);
    assert!(handle.is_running());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_sweeping() {
    let clock = ManualClock::at(0);
    let (controller, _policy) = populated(&clock, 3);
    let handle = Sweeper::new(
        controller.clone(),
        SweeperConfig::new(Duration::from_secs(10)).unwrap(),
    )
    .start();

    handle.shutdown().await.unwrap();

    clock.set(120_000);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(controller.counter_count(), 3);

    // Manual sweeps still work after the task is gone
    assert_eq!(controller.sweep_expired(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_keeps_running_when_handle_dropped() {
    let clock = ManualClock::at(0);
    let (controller, _policy) = populated(&clock, 4);
    let handle = Sweeper::new(
        controller.clone(),
        SweeperConfig::new(Duration::from_secs(5)).unwrap(),
    )
    .start();
    drop(handle);

    clock.set(70_000);
    tokio::time::sleep(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;

    assert_eq!(controller.counter_count(), 0);
}

#[tokio::test]
async fn test_shutdown_is_prompt() {
    let controller = AdmissionController::new();
    let handle = Sweeper::new(controller, SweeperConfig::default()).start();

    let started = std::time::Instant::now();
    handle.shutdown().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}
