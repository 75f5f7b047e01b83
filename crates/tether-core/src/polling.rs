//! Poll a fetch function until a predicate holds
//!
//! Used both to wait for a remote session to finish and, more generally, to
//! retry until some remote resource is ready.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{TetherError, TetherResult};
use crate::types::Session;

/// Fetch, test, sleep, repeat.
///
/// The first fetch happens immediately. After each unsatisfied result the
/// waiter sleeps `interval`; if `timeout` (measured from the call) has elapsed
/// by then it fails with [`TetherError::Timeout`] instead of fetching again.
/// Fetch errors propagate unchanged.
pub async fn wait_for<T, F, Fut, P>(
    mut fetch: F,
    predicate: P,
    interval: Duration,
    timeout: Option<Duration>,
) -> TetherResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TetherResult<T>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        let value = fetch().await?;
        polls += 1;
        if predicate(&value) {
            debug!("Predicate satisfied after {} polls", polls);
            return Ok(value);
        }

        match timeout {
            Some(budget) => {
                let remaining = budget.saturating_sub(start.elapsed());
                sleep(interval.min(remaining)).await;
                if start.elapsed() >= budget {
                    return Err(TetherError::timeout(
                        format!("condition not met after {} polls", polls),
                        start.elapsed(),
                    ));
                }
            }
            None => sleep(interval).await,
        }
    }
}

/// Wait until the fetched session reaches `completed` or `failed`
pub async fn wait_until_terminal<F, Fut>(
    fetch: F,
    interval: Duration,
    timeout: Option<Duration>,
) -> TetherResult<Session>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TetherResult<Session>>,
{
    wait_for(fetch, |s: &Session| s.state.is_terminal(), interval, timeout).await
}
