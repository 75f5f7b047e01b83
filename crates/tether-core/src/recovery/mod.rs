//! Retry and backoff for transient remote failures
//!
//! The activity stream uses this during warm-up, when a freshly created
//! session can briefly answer "not found".

pub mod backoff;
pub mod retry;

pub use backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
pub use retry::{RetryConfig, RetryPolicy, retry_with_config};
