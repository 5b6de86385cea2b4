// src/utils/retry.rs

//! Exponential backoff with jitter for outbound requests.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

use crate::models::HttpConfig;

/// Retry schedule applied to each outbound call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base: Duration,
    pub max: Duration,
    /// Up to this fraction of the delay is added at random
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.retry_base_ms),
            max: Duration::from_millis(config.retry_max_ms),
            jitter_ratio: config.jitter_ratio.clamp(0.0, 1.0),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let backoff = base_ms.saturating_mul(1u64 << attempt.min(16)).min(max_ms);

        let jitter = if self.jitter_ratio > 0.0 {
            (backoff as f64 * rng.gen_range(0.0..=self.jitter_ratio)) as u64
        } else {
            0
        };
        Duration::from_millis(backoff.saturating_add(jitter))
    }

    /// Statuses worth another attempt.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}
