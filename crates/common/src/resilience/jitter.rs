//! Jittered delay window for the one-shot reattempt after a faulted
//! construction.
//!
//! Each delay is drawn uniformly from `[min, max]`, so callers that observed
//! the same faulted entry wake at different instants.

use std::time::Duration;

use rand::Rng;

use crate::error::{CommonError, CommonResult};

/// Default lower bound of the reattempt window.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(150);

/// Default upper bound of the reattempt window.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(250);

/// Upper limit accepted for either bound.
pub const MAX_ALLOWED_DELAY: Duration = Duration::from_secs(10);

/// Inclusive window a reattempt delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDelay {
    min: Duration,
    max: Duration,
}

impl RetryDelay {
    /// Create a window, rejecting `min > max` and bounds above
    /// [`MAX_ALLOWED_DELAY`].
    ///
    /// # Errors
    /// Returns `CommonError::Config` when the bounds are out of order or too
    /// large.
    pub fn new(min: Duration, max: Duration) -> CommonResult<Self> {
        if min > max {
            return Err(CommonError::config_field(
                "retry.min_delay_ms",
                format!("minimum delay {:?} exceeds maximum delay {:?}", min, max),
            ));
        }
        if max > MAX_ALLOWED_DELAY {
            return Err(CommonError::config_field(
                "retry.max_delay_ms",
                format!("maximum delay {:?} exceeds limit {:?}", max, MAX_ALLOWED_DELAY),
            ));
        }
        Ok(Self { min, max })
    }

    /// Create a window from millisecond bounds.
    ///
    /// # Errors
    /// Same as [`RetryDelay::new`].
    pub fn from_millis(min_ms: u64, max_ms: u64) -> CommonResult<Self> {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// A zero-length window. Useful when tests must not wait.
    pub const fn immediate() -> Self {
        Self { min: Duration::ZERO, max: Duration::ZERO }
    }

    /// Lower bound.
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from the window.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self { min: DEFAULT_MIN_DELAY, max: DEFAULT_MAX_DELAY }
    }
}
