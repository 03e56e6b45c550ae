//! Integration tests for the reattempt delay window.

#![cfg(feature = "runtime")]

use std::time::Duration;

use storekeeper_common::resilience::jitter::{DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};
use storekeeper_common::RetryDelay;

/// Validates that a sampled delay drives a real sleep within the window.
///
/// Assertions:
/// - Elapsed paused time equals the sampled delay and stays in bounds.
#[tokio::test(start_paused = true)]
async fn sampled_delay_sleeps_within_window() {
    let window = RetryDelay::default();
    assert_eq!(window.min(), DEFAULT_MIN_DELAY);
    assert_eq!(window.max(), DEFAULT_MAX_DELAY);

    let delay = window.sample();
    let started = tokio::time::Instant::now();
    tokio::time::sleep(delay).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed <= Duration::from_millis(251));
}

/// Validates that a custom window is honored.
///
/// Assertions:
/// - Samples from a 10..=20 ms window never escape it.
#[test]
fn custom_window_is_respected() {
    let window = RetryDelay::from_millis(10, 20).unwrap();
    for _ in 0..100 {
        let d = window.sample();
        assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
    }
}
