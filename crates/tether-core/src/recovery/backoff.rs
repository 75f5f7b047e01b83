//! Backoff strategies for retry operations

use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Default::default()
        }
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// Backoff strategy trait
pub trait BackoffStrategy: Send + Sync {
    /// Delay for the given attempt number (0-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration;

    fn reset(&mut self);
}

/// Exponential backoff, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Get the next delay and advance the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt += 1;
        delay
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_secs_f64()
            * self.config.multiplier.powi(attempt.min(i32::MAX as u32) as i32);

        Duration::try_from_secs_f64(base_delay.min(self.config.max_delay.as_secs_f64()))
            .unwrap_or(self.config.max_delay)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_warmup_schedule() {
        let backoff = ExponentialBackoff::new();

        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(16));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(9), Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_backoff_cap() {
        let config = BackoffConfig::with_initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5));
        let backoff = ExponentialBackoff::with_config(config);

        // 2^10 seconds, capped at 5
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_unrepresentable_delay_falls_back_to_cap() {
        let negative = BackoffConfig::with_initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5))
            .multiplier(-2.0);
        assert_eq!(
            ExponentialBackoff::with_config(negative).delay_for_attempt(1),
            Duration::from_secs(5)
        );

        let nan = BackoffConfig::with_initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5))
            .multiplier(f64::NAN);
        assert_eq!(
            ExponentialBackoff::with_config(nan).delay_for_attempt(3),
            Duration::from_secs(5)
        );

        let unbounded = BackoffConfig::with_initial_delay(Duration::from_secs(1))
            .max_delay(Duration::MAX);
        assert_eq!(
            ExponentialBackoff::with_config(unbounded).delay_for_attempt(2000),
            Duration::MAX
        );
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = ExponentialBackoff::new();

        let _ = backoff.next_delay();
        let _ = backoff.next_delay();
        let third = backoff.next_delay();

        assert_eq!(backoff.attempt(), 3);
        assert_eq!(third, Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}
