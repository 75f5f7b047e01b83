//! Retry policies for transient remote failures

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
use crate::error::{TetherError, TetherResult};

/// Configuration for retry behavior
///
/// # Example
/// ```
/// use tether_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_attempts(5)
///     .with_initial_delay(Duration::from_millis(200));
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with limited attempts
    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
        }
    }

    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::with_config(self.to_backoff_config())
    }
}

/// Retry policy for operations
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: Box<dyn BackoffStrategy>,
}

impl RetryPolicy {
    pub fn with_config(config: RetryConfig) -> Self {
        let backoff = config.create_backoff();
        Self {
            config,
            backoff: Box::new(backoff),
        }
    }

    /// Set custom backoff strategy
    pub fn with_backoff<B: BackoffStrategy + 'static>(mut self, backoff: B) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// `attempt` is 0-indexed, so max_attempts=3 allows attempts 0, 1 and 2
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.config.max_attempts
    }

    /// Run `operation` until it succeeds, fails with an error `retry_if`
    /// rejects, or runs out of attempts. The last error is returned as is.
    pub async fn execute<T, F, Fut, P>(
        &mut self,
        mut operation: F,
        retry_if: P,
        cancel_token: Option<&CancellationToken>,
    ) -> TetherResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TetherResult<T>>,
        P: Fn(&TetherError) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    self.backoff.reset();
                    return Ok(value);
                }
                Err(error) => {
                    if !retry_if(&error) || !self.has_attempts_left(attempt) {
                        return Err(error);
                    }

                    let delay = self.backoff.delay_for_attempt(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.config.max_attempts,
                        error,
                        delay
                    );
                    attempt += 1;

                    match cancel_token {
                        Some(token) => {
                            tokio::select! {
                                _ = token.cancelled() => return Err(TetherError::Cancelled),
                                _ = sleep(delay) => {}
                            }
                        }
                        None => sleep(delay).await,
                    }
                }
            }
        }
    }
}

/// Retry with a config, retrying only errors accepted by `retry_if`
pub async fn retry_with_config<T, F, Fut, P>(
    config: RetryConfig,
    operation: F,
    retry_if: P,
    cancel_token: Option<&CancellationToken>,
) -> TetherResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TetherResult<T>>,
    P: Fn(&TetherError) -> bool,
{
    let mut policy = RetryPolicy::with_config(config);
    policy.execute(operation, retry_if, cancel_token).await
}
