//! Bounded retry for transport failures
//!
//! Portal calls fail hard by default (`max_retries = 0`). When the booking
//! configuration opts in, recoverable transport errors are retried with
//! exponential backoff; everything else is returned immediately.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 disables retrying)
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,

    /// Cap on the delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before `attempt` (attempt 0 runs immediately)
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

/// Run `operation`, retrying while the error is a recoverable transport failure
///
/// Booking rejections and allocation failures are never retried here; the
/// track loop owns those.
pub async fn with_transport_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_if(config, operation, |e| {
        matches!(e, Error::Fetch(inner) if inner.is_recoverable())
    })
    .await
}

/// Run `operation`, retrying errors accepted by `should_retry`
pub async fn with_retry_if<T, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = config.delay_for(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && should_retry(&e) => {
                warn!(attempt, max_retries = config.max_retries, error = %e, "Operation failed, will retry");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
