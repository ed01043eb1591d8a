use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::settings::RetryConfig;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30000;

/// Retry policy for transient failures. Immutable once an executor holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retryable_status_codes: BTreeSet<u16>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// timeouts and refused connections count as transient
    pub retry_network_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            retry_network_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Overlay the configured values on top of the defaults.
    pub fn from_config(retry: Option<&RetryConfig>) -> Self {
        let defaults = Self::default();
        let Some(retry) = retry else {
            return defaults;
        };
        Self {
            max_retries: retry.max_retries.unwrap_or(defaults.max_retries),
            retryable_status_codes: retry
                .retryable_status_codes
                .as_ref()
                .map(|codes| codes.iter().copied().collect())
                .unwrap_or(defaults.retryable_status_codes),
            base_delay: retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            max_delay: retry
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            retry_network_errors: retry
                .retry_network_errors
                .unwrap_or(defaults.retry_network_errors),
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Delay before retry number `retry` (1-based): doubles from `base_delay`, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Suspension used between attempts; swapped out in tests to record delays.
pub trait Pause: Send + Sync {
    fn pause(&self, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

impl Pause for TokioPause {
    fn pause(&self, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(sleep(delay))
    }
}
