//! Concurrency-bounded batch mapping
//!
//! A fixed number of workers pull the next item from one shared cursor, so a
//! worker that finishes early immediately takes more work. Workers are plain
//! futures polled together on the caller's task: nothing is spawned and the
//! mapped function needs neither `Send` nor `'static`.

use futures::future::{join_all, try_join_all};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{BatchFailure, TetherError, TetherResult};

/// Options for [`batch_map`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of workers
    pub concurrency: usize,
    /// Abort on the first error instead of collecting them
    pub stop_on_error: bool,
    /// Fixed delay before each item is processed
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            stop_on_error: true,
            delay: Duration::ZERO,
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Map `items` through `f` with at most `options.concurrency` in flight.
///
/// Results come back in input order regardless of completion order.
/// With `stop_on_error` the first error cancels the remaining work and is
/// returned as is. Without it every item runs and, if any failed, a single
/// [`TetherError::Batch`] carrying each failure is returned.
pub async fn batch_map<T, R, F, Fut>(
    items: Vec<T>,
    f: F,
    options: BatchOptions,
) -> TetherResult<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = TetherResult<R>>,
{
    validate(&options)?;

    if options.stop_on_error {
        return run_fail_fast(items, f, &options).await;
    }

    let total = items.len();
    let settled = run_settled(items, f, &options).await;

    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (index, outcome) in settled.into_iter().enumerate() {
        match outcome {
            Ok(value) => results.push(value),
            Err(error) => failures.push(BatchFailure { index, error }),
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        Err(TetherError::Batch { total, failures })
    }
}

/// Like [`batch_map`] but never aborts: one outcome per item, in input order.
/// `options.stop_on_error` is ignored.
pub async fn batch_map_settled<T, R, F, Fut>(
    items: Vec<T>,
    f: F,
    options: BatchOptions,
) -> TetherResult<Vec<TetherResult<R>>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = TetherResult<R>>,
{
    validate(&options)?;
    Ok(run_settled(items, f, &options).await)
}

fn validate(options: &BatchOptions) -> TetherResult<()> {
    if options.concurrency == 0 {
        return Err(TetherError::invalid_field(
            "concurrency",
            "concurrency must be at least 1",
        ));
    }
    Ok(())
}

async fn run_fail_fast<T, R, F, Fut>(
    items: Vec<T>,
    f: F,
    options: &BatchOptions,
) -> TetherResult<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = TetherResult<R>>,
{
    let total = items.len();
    let workers = options.concurrency.min(total);
    let queue = Mutex::new(items.into_iter().enumerate());
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());

    let (queue_ref, slots_ref, f) = (&queue, &slots, &f);
    let worker = move |_| async move {
        loop {
            let next = queue_ref.lock().next();
            let Some((index, item)) = next else {
                return Ok::<(), TetherError>(());
            };
            if !options.delay.is_zero() {
                sleep(options.delay).await;
            }
            let value = f(item).await?;
            slots_ref.lock()[index] = Some(value);
        }
    };

    // try_join_all drops the remaining workers as soon as one fails
    try_join_all((0..workers).map(worker)).await?;
    debug!("Batch of {} items completed", total);

    Ok(slots.into_inner().into_iter().flatten().collect())
}

async fn run_settled<T, R, F, Fut>(
    items: Vec<T>,
    f: F,
    options: &BatchOptions,
) -> Vec<TetherResult<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = TetherResult<R>>,
{
    let total = items.len();
    let workers = options.concurrency.min(total);
    let queue = Mutex::new(items.into_iter().enumerate());
    let slots: Mutex<Vec<Option<TetherResult<R>>>> =
        Mutex::new((0..total).map(|_| None).collect());

    let (queue_ref, slots_ref, f) = (&queue, &slots, &f);
    let worker = move |_| async move {
        loop {
            let next = queue_ref.lock().next();
            let Some((index, item)) = next else {
                return;
            };
            if !options.delay.is_zero() {
                sleep(options.delay).await;
            }
            let outcome = f(item).await;
            slots_ref.lock()[index] = Some(outcome);
        }
    };

    join_all((0..workers).map(worker)).await;

    let outcomes: Vec<TetherResult<R>> = slots.into_inner().into_iter().flatten().collect();
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    debug!("Batch of {} items settled ({} failed)", total, failed);
    outcomes
}
