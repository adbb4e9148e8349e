use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often and how patiently a transport re-sends a failed request.
///
/// Delays grow geometrically from `base_delay_ms` and are capped at
/// `max_delay_ms`. Only failures the transport classifies as transient are
/// retried; the policy itself knows nothing about error kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RetryPolicyFields")]
pub struct RetryPolicy {
    /// Re-sends after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
            multiplier: multiplier.max(1.0),
        }
    }

    /// Send once, never retry
    pub fn no_retry() -> Self {
        Self::new(0, 0, 0, 1.0)
    }

    /// Short waits, for interactive use and tests
    pub fn fast() -> Self {
        Self::new(3, 10, 100, 2.0)
    }

    /// Rides out a brief instance restart or a throttling window
    pub fn standard() -> Self {
        Self::new(5, 100, 5_000, 2.0)
    }

    /// True if a request that has failed `retries_done` retries may be sent again
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Wait before retry number `retry` (0-indexed)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    /// Sum of every backoff the policy can impose on one request
    pub fn worst_case_delay(&self) -> Duration {
        (0..self.max_retries).map(|r| self.backoff_duration(r)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Serialized form; every load goes through [`RetryPolicy::new`]
#[derive(Deserialize)]
#[serde(default)]
struct RetryPolicyFields {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    multiplier: f64,
}

impl Default for RetryPolicyFields {
    fn default() -> Self {
        let standard = RetryPolicy::standard();
        Self {
            max_retries: standard.max_retries,
            base_delay_ms: standard.base_delay_ms,
            max_delay_ms: standard.max_delay_ms,
            multiplier: standard.multiplier,
        }
    }
}

impl From<RetryPolicyFields> for RetryPolicy {
    fn from(f: RetryPolicyFields) -> Self {
        RetryPolicy::new(f.max_retries, f.base_delay_ms, f.max_delay_ms, f.multiplier)
    }
}
