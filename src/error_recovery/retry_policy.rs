//! Bounded retry policy for publish attempts
//!
//! Retries are decided by error classification: only errors that report
//! `is_retryable()` (server errors and transport failures) are tried again,
//! everything else stops the loop on the spot.

use crate::config::RetryConfig;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Fixed pause between attempts
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::fixed(config.attempts.max(1), config.backoff)
    }
}

impl RetryPolicy {
    /// Fixed-delay policy
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self, error: &BridgeError) -> bool {
        error.is_retryable()
    }
}

/// Result of a retried operation together with the number of attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Retry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryStats {
    /// Total operations attempted
    pub total_operations: u64,
    /// Successful operations (no retry needed)
    pub successful_first_attempt: u64,
    /// Successful operations (after retry)
    pub successful_after_retry: u64,
    /// Failed operations (retries exhausted or error not retryable)
    pub failed: u64,
    /// Total retry attempts
    pub total_retry_attempts: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    total_operations: AtomicU64,
    successful_first_attempt: AtomicU64,
    successful_after_retry: AtomicU64,
    failed: AtomicU64,
    total_retry_attempts: AtomicU64,
}

/// Retry executor
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    stats: StatCounters,
}

impl RetryExecutor {
    /// Create new retry executor
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            stats: StatCounters::default(),
        }
    }

    /// Execute operation with retry policy.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.stats.total_operations.fetch_add(1, Ordering::Relaxed);

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                debug!("Retry attempt {attempt} of {max_attempts}");
            }

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt == 1 {
                        self.stats
                            .successful_first_attempt
                            .fetch_add(1, Ordering::Relaxed);
                    } else {
                        self.stats
                            .successful_after_retry
                            .fetch_add(1, Ordering::Relaxed);
                        info!("Operation succeeded after {attempt} attempts");
                    }
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            if !self.policy.should_retry(&error) {
                debug!("Error not retryable: {error}");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return Attempted {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            if attempt >= max_attempts {
                warn!("Operation failed after {attempt} attempts: {error}");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return Attempted {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let delay = self.policy.delay;
            self.stats
                .total_retry_attempts
                .fetch_add(1, Ordering::Relaxed);
            warn!(
                "Attempt {attempt}/{max_attempts} failed ({error}), retrying in {:?}",
                delay
            );

            sleep(delay).await;
        }
    }

    /// Get retry statistics
    pub fn stats(&self) -> RetryStats {
        RetryStats {
            total_operations: self.stats.total_operations.load(Ordering::Relaxed),
            successful_first_attempt: self.stats.successful_first_attempt.load(Ordering::Relaxed),
            successful_after_retry: self.stats.successful_after_retry.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            total_retry_attempts: self.stats.total_retry_attempts.load(Ordering::Relaxed),
        }
    }
}
