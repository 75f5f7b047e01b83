//! Tether client
//!
//! [`TetherClient`] is the explicit context object tying a [`RemoteApi`] to
//! the local cache. Reads go through the cache when its tier allows it and
//! fall back to the remote otherwise; every remote read is written through.

use async_stream::try_stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use tether_core::{
    Activity, ActivityStorage, BatchOptions, GlobalCacheMetadata, JsonlActivityStore, Session,
    SessionStorage, StreamOptions, SyncConfig, TetherError, TetherResult, batch_map_settled,
    is_cache_valid, stream_activities, wait_until_terminal,
};

use crate::cache::{LocalCache, SessionsView};
use crate::remote::RemoteApi;

/// Outcome of [`TetherClient::sync_sessions`]
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Ids refreshed and written to the cache
    pub synced: Vec<String>,
    /// Ids that could not be fetched, with the error each produced
    pub failed: Vec<(String, TetherError)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Client context: configuration, remote access and the local cache
pub struct TetherClient {
    config: SyncConfig,
    remote: Arc<dyn RemoteApi>,
    cache: LocalCache,
}

impl TetherClient {
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteApi>) -> TetherResult<Self> {
        config.validate()?;
        let cache = LocalCache::open(&config)?;
        Ok(Self {
            config,
            remote,
            cache,
        })
    }

    /// Default config overridden by `TETHER_*` variables, read now
    pub fn from_env(remote: Arc<dyn RemoteApi>) -> TetherResult<Self> {
        Self::new(SyncConfig::from_env()?, remote)
    }

    /// Create the cache directories. Idempotent.
    pub async fn init(&self) -> TetherResult<()> {
        self.cache.init().await
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn sessions(&self) -> SessionsView<'_> {
        self.cache.sessions()
    }

    /// Stream options carrying this client's page size and warm-up retry
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::new()
            .with_page_size(self.config.page_size)
            .with_warmup_retry(self.config.warmup_retry.clone())
    }

    /// Session by id, from the cache when its copy is warm or frozen
    pub async fn session(&self, id: &str) -> TetherResult<Session> {
        let cached = self.cache.cached(id).await?;
        if is_cache_valid(cached.as_ref(), Utc::now()) {
            if let Some(cached) = cached {
                debug!("Cache hit for session {}", id);
                return Ok(cached.resource);
            }
        }

        debug!("Cache miss for session {}", id);
        self.refresh_session(id).await
    }

    /// Fetch from the remote and write through, ignoring the cache
    pub async fn refresh_session(&self, id: &str) -> TetherResult<Session> {
        if id.trim().is_empty() {
            return Err(TetherError::invalid_field("id", "session id must not be empty"));
        }
        let session = self.remote.get_session(id).await?;
        let cached = self.cache.session_store().upsert(&session).await?;
        Ok(cached.resource)
    }

    /// Refresh several sessions concurrently.
    ///
    /// A failed fetch does not stop the others. Every fetched session is
    /// written, then the global metadata is updated.
    pub async fn sync_sessions(&self, ids: &[String]) -> TetherResult<SyncReport> {
        let options = BatchOptions::default()
            .with_concurrency(self.config.concurrency)
            .with_stop_on_error(false);

        let outcomes = batch_map_settled(
            ids.to_vec(),
            |id| async move { self.remote.get_session(&id).await },
            options,
        )
        .await?;

        let mut report = SyncReport::default();
        let mut fetched = Vec::new();
        for (id, outcome) in ids.iter().zip(outcomes) {
            match outcome {
                Ok(session) => fetched.push(session),
                Err(e) => {
                    warn!("Failed to sync session {}: {}", id, e);
                    report.failed.push((id.clone(), e));
                }
            }
        }

        let written = self.cache.session_store().upsert_many(&fetched).await?;
        report.synced = written.into_iter().map(|c| c.resource.id).collect();

        let total = self.sessions().count().await;
        self.cache.metadata().record_sync(total, Utc::now()).await?;
        info!(
            "Synced {} sessions ({} failed)",
            report.synced.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Catch up on a session's activities and store the new ones.
    ///
    /// Resumes after the locally stored high-water mark and stops at the live
    /// boundary. Returns the number of activities appended.
    pub async fn sync_activities(&self, session_id: &str) -> TetherResult<usize> {
        let store = self.cache.activities(session_id)?;
        store.init().await?;

        let options = resume_from_store(&store, self.stream_options().catch_up_only()).await?;
        let mut stream = stream_activities(
            session_id,
            self.remote.clone(),
            self.config.polling_interval,
            options,
        );

        let mut appended = 0;
        while let Some(activity) = stream.next().await {
            store.append(&activity?).await?;
            appended += 1;
        }

        debug!("Appended {} activities for session {}", appended, session_id);
        Ok(appended)
    }

    /// Tail a session's activities, persisting each one before it is yielded.
    ///
    /// Starts after the locally stored high-water mark unless `options`
    /// carries its own resume point.
    pub fn follow_activities(
        &self,
        session_id: &str,
        options: StreamOptions,
    ) -> BoxStream<'_, TetherResult<Activity>> {
        Box::pin(self.persisted_activities(session_id.to_string(), options))
    }

    fn persisted_activities(
        &self,
        session_id: String,
        options: StreamOptions,
    ) -> impl Stream<Item = TetherResult<Activity>> + Send + '_ {
        try_stream! {
            let store = self.cache.activities(&session_id)?;
            store.init().await?;

            let options = if options.resume_from.is_some() {
                options
            } else {
                resume_from_store(&store, options).await?
            };

            let mut stream = stream_activities(
                session_id.clone(),
                self.remote.clone(),
                self.config.polling_interval,
                options,
            );
            while let Some(item) = stream.next().await {
                let activity = item?;
                store.append(&activity).await?;
                yield activity;
            }
        }
    }

    /// Poll the remote until the session completes or fails, then cache it
    pub async fn wait_until_terminal(
        &self,
        id: &str,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> TetherResult<Session> {
        let session =
            wait_until_terminal(|| self.remote.get_session(id), interval, timeout).await?;
        let cached = self.cache.session_store().upsert(&session).await?;
        Ok(cached.resource)
    }

    pub async fn cache_status(&self) -> GlobalCacheMetadata {
        self.cache.status().await
    }

    /// Remove a session's snapshot and activity log from the cache
    pub async fn evict(&self, id: &str) -> TetherResult<()> {
        self.cache.evict(id).await
    }
}

/// Seed `options` with the store's high-water mark.
///
/// Every stored activity sharing the mark's timestamp counts as delivered, so
/// ties at the boundary are not fetched again.
async fn resume_from_store(
    store: &JsonlActivityStore,
    options: StreamOptions,
) -> TetherResult<StreamOptions> {
    let Some(latest) = store.latest().await? else {
        return Ok(options);
    };

    let mut ids = Vec::new();
    let mut scan = store.scan();
    while let Some(activity) = scan.next().await {
        let activity = activity?;
        if activity.create_time == latest.create_time {
            ids.push(activity.id);
        }
    }
    Ok(options.resume_at(latest.create_time, ids))
}
