//! Opt-in bounded retry for individual lookups.
//!
//! The default policy makes exactly one attempt. Extra attempts only apply to
//! errors where [`CitationError::is_retryable`](crate::error::CitationError::is_retryable)
//! holds, and each one still hits the lookup source, so keep `max_retries` small.

use std::time::Duration;

/// Delay between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let millis = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
                Duration::from_millis(millis).min(*max)
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_secs(30),
            max: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::default()
    }
}
