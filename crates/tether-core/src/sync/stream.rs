//! Hybrid catch-up / live activity stream
//!
//! Pages are fetched back to back while the remote keeps returning a
//! continuation token. Once a page comes back without one the stream is "live":
//! it sleeps for the polling interval and re-lists from the first page to pick
//! up whatever was appended meanwhile. A [`StreamCursor`] drops everything the
//! consumer has already seen, so the output is ordered by `create_time` and
//! free of duplicates across both modes.
//!
//! The remote is assumed to list activities in non-decreasing time order. An
//! activity that arrives older than its predecessor is logged and may be lost;
//! the stream does not try to reorder.

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::cursor::StreamCursor;
use crate::error::{TetherError, TetherResult};
use crate::recovery::{RetryConfig, retry_with_config};
use crate::types::{Activity, Originator};

/// One page of the remote activity listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    /// Continuation token; `None` on the last page
    pub next_page_token: Option<String>,
}

impl ActivityPage {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self {
            activities,
            next_page_token: None,
        }
    }

    pub fn with_next_page_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }
}

/// Source of activity pages for one session
#[async_trait]
pub trait ActivityPageFetcher: Send + Sync {
    /// Fetch the page starting at `page_token` (`None` for the first page).
    ///
    /// A session the remote does not know about yet must be reported as
    /// [`TetherError::NotFound`] so the stream can wait for it to appear.
    async fn fetch_page(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage>;
}

#[async_trait]
impl<T: ActivityPageFetcher + ?Sized> ActivityPageFetcher for &T {
    async fn fetch_page(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage> {
        (**self).fetch_page(session_id, page_token, page_size).await
    }
}

#[async_trait]
impl<T: ActivityPageFetcher + ?Sized> ActivityPageFetcher for Arc<T> {
    async fn fetch_page(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage> {
        (**self).fetch_page(session_id, page_token, page_size).await
    }
}

/// Options for [`stream_activities`]
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Drop activities from this originator (after dedup bookkeeping)
    pub exclude_originator: Option<Originator>,
    /// Page size hint passed to the fetcher
    pub page_size: Option<u32>,
    /// Retry schedule for "not found" on the very first fetch
    pub warmup_retry: RetryConfig,
    /// Keep polling after the last page. With `false` the stream ends at the
    /// live boundary.
    pub follow: bool,
    /// Start from a previously reached position instead of the beginning
    pub resume_from: Option<StreamCursor>,
    /// Ends the stream at its next suspension point
    pub cancel: Option<CancellationToken>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            exclude_originator: None,
            page_size: None,
            warmup_retry: RetryConfig::default(),
            follow: true,
            resume_from: None,
            cancel: None,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_originator(mut self, originator: Originator) -> Self {
        self.exclude_originator = Some(originator);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_warmup_retry(mut self, retry: RetryConfig) -> Self {
        self.warmup_retry = retry;
        self
    }

    /// Stop once caught up instead of tailing
    pub fn catch_up_only(mut self) -> Self {
        self.follow = false;
        self
    }

    /// Skip everything up to and including `activity`
    pub fn resume_after(self, activity: &Activity) -> Self {
        self.resume_at(activity.create_time, [activity.id.clone()])
    }

    /// Skip everything before `time`, and the listed ids at exactly `time`
    pub fn resume_at(mut self, time: DateTime<Utc>, ids: impl IntoIterator<Item = String>) -> Self {
        self.resume_from = Some(StreamCursor::resume_at(time, ids));
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_excluded(&self, activity: &Activity) -> bool {
        match (&self.exclude_originator, &activity.originator) {
            (Some(excluded), Some(originator)) => excluded == originator,
            _ => false,
        }
    }
}

/// Stream the activities of `session_id`, oldest first, without duplicates.
///
/// Nothing is fetched until the stream is polled. Fetch errors end the stream
/// after being yielded once; the consumer decides whether to start a new one.
/// An empty `session_id` yields a single [`TetherError::InvalidInput`].
///
/// Dropping the stream, or cancelling `options.cancel`, stops it at once,
/// including during a live-mode sleep or a warm-up backoff.
pub fn stream_activities<'a, F>(
    session_id: impl Into<String>,
    fetcher: F,
    polling_interval: Duration,
    options: StreamOptions,
) -> BoxStream<'a, TetherResult<Activity>>
where
    F: ActivityPageFetcher + 'a,
{
    Box::pin(activity_stream(
        session_id.into(),
        fetcher,
        polling_interval,
        options,
    ))
}

fn activity_stream<'a, F>(
    session_id: String,
    fetcher: F,
    polling_interval: Duration,
    options: StreamOptions,
) -> impl Stream<Item = TetherResult<Activity>> + Send + 'a
where
    F: ActivityPageFetcher + 'a,
{
    try_stream! {
        if session_id.trim().is_empty() {
            Err::<(), _>(TetherError::invalid_field(
                "session_id",
                "session id must not be empty",
            ))?;
        }

        let cancel = options.cancel.clone();
        let mut cursor = options.resume_from.clone().unwrap_or_default();
        let mut page_token: Option<String> = None;
        let mut warmed_up = false;
        // time of the previous activity in the current listing pass
        let mut previous: Option<DateTime<Utc>> = None;
        let mut yielded = 0usize;

        loop {
            let fetched = if warmed_up {
                until_cancelled(
                    cancel.as_ref(),
                    fetcher.fetch_page(&session_id, page_token.clone(), options.page_size),
                )
                .await
            } else {
                let first_token = page_token.clone();
                until_cancelled(
                    cancel.as_ref(),
                    retry_with_config(
                        options.warmup_retry.clone(),
                        || fetcher.fetch_page(&session_id, first_token.clone(), options.page_size),
                        TetherError::is_not_found,
                        cancel.as_ref(),
                    ),
                )
                .await
            };

            let page = match fetched {
                Err(TetherError::Cancelled) => {
                    debug!("Activity stream for {} cancelled", session_id);
                    break;
                }
                other => other?,
            };
            warmed_up = true;

            for activity in page.activities {
                if let Some(prev) = previous {
                    if activity.create_time < prev {
                        warn!(
                            "Activity {} of session {} arrived out of order ({} after {})",
                            activity.id, session_id, activity.create_time, prev
                        );
                    }
                }
                previous = Some(activity.create_time);

                if !cursor.admit(&activity) || options.is_excluded(&activity) {
                    continue;
                }
                yielded += 1;
                yield activity;
            }

            if page.next_page_token.is_some() {
                page_token = page.next_page_token;
                continue;
            }

            if !options.follow {
                debug!("Caught up on session {} ({} new activities)", session_id, yielded);
                break;
            }

            page_token = None;
            previous = None;
            let slept = until_cancelled(cancel.as_ref(), async {
                sleep(polling_interval).await;
                Ok(())
            })
            .await;
            if slept.is_err() {
                debug!("Activity stream for {} cancelled while polling", session_id);
                break;
            }
            debug!("Polling session {} for new activities", session_id);
        }
    }
}

/// Run `future` unless `cancel` fires first, in which case it is dropped
/// and [`TetherError::Cancelled`] is returned
async fn until_cancelled<T>(
    cancel: Option<&CancellationToken>,
    future: impl Future<Output = TetherResult<T>>,
) -> TetherResult<T> {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => Err(TetherError::Cancelled),
                result = future => result,
            }
        }
        None => future.await,
    }
}
