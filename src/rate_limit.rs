//! Randomized pacing between consecutive lookups.

use crate::error::{CitationError, Result};
use rand::Rng;
use std::time::Duration;

/// Inclusive delay range between lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(CitationError::Config(format!(
                "delay minimum ({}ms) exceeds maximum ({}ms)",
                min.as_millis(),
                max.as_millis()
            )));
        }
        Ok(Self { min, max })
    }

    pub fn from_secs(min: u64, max: u64) -> Result<Self> {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(10),
            max: Duration::from_secs(20),
        }
    }
}

/// Draws an independent uniform delay from a [`DelayRange`] on every call.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    range: DelayRange,
}

impl RateLimiter {
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }

    /// Next delay, uniform over `[min, max]` at millisecond resolution.
    pub fn next_delay(&self) -> Duration {
        let min = self.range.min.as_millis() as u64;
        let max = self.range.max.as_millis() as u64;
        if min == max {
            return self.range.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}
