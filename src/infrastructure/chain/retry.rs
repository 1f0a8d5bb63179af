use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::ChainError;
use crate::domain::models::RetryConfig;

/// Retry policy for read-only chain calls
///
/// Only errors classified as transient by [`ChainError::is_transient`] are
/// retried. Transactions are never routed through this policy: a resent
/// transaction could execute twice.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Policy that never retries
    pub const fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Execute an operation with exponential backoff retry logic
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut attempt = 0_u32;

        let result = backoff::future::retry_notify(
            self.backoff(),
            || {
                let current = attempt;
                attempt += 1;
                let call = operation();
                async move {
                    call.await.map_err(|err| {
                        if self.should_retry(&err, current) {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: ChainError, wait: Duration| {
                warn!(error = %err, retry_in = ?wait, "Transient query error, retrying");
            },
        )
        .await;

        match &result {
            Ok(_) if attempt > 1 => debug!("Query succeeded after {} retries", attempt - 1),
            Err(err) if attempt > 1 => warn!("Query failed after {} attempts: {}", attempt, err),
            _ => {}
        }
        result
    }

    /// Intervals of min(initial_backoff * 2^attempt, max_backoff), no jitter
    fn backoff(&self) -> ExponentialBackoff {
        let mut policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.max_backoff_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();
        policy.reset();
        policy
    }

    const fn should_retry(&self, error: &ChainError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
