use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::MarketDataError;

/// Classification for retry policy.
///
/// | Class | Retry same request? | Try next oracle? |
/// |-------|---------------------|------------------|
/// | `Never` | No | Yes, the price is simply unavailable here |
/// | `WithBackoff` | Once, after a pause | Only if the retry also fails |
/// | `NextProvider` | No | Yes |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Bad asset, unit or date. Retrying won't help.
    Never,

    /// Timeout or rate limit. Pause, then try exactly once more.
    WithBackoff,

    /// This oracle failed, another one might not.
    NextProvider,
}

/// Single-retry rule for oracle requests.
///
/// A timeout is retried once after `timeout_delay`, a rate limit once after
/// `rate_limit_delay`. Every other failure is returned as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout_delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout_delay: Duration, rate_limit_delay: Duration) -> Self {
        Self {
            timeout_delay,
            rate_limit_delay,
        }
    }

    /// No pauses at all, handy for offline runs and tests.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Runs `attempt`, retrying it once if the first failure is transient.
    pub async fn retry_once<T, F, Fut>(&self, provider: &str, mut attempt: F) -> Result<T, MarketDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        match attempt().await {
            Err(error) if error.retry_class() == RetryClass::WithBackoff => {
                let delay = if error.is_rate_limited() {
                    self.rate_limit_delay
                } else {
                    self.timeout_delay
                };
                warn!(
                    "{} request failed ({}), trying one more time in {:?}",
                    provider, error, delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt().await
            }
            other => other,
        }
    }
}
