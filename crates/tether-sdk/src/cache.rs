//! Local cache handle
//!
//! Everything here works without the remote service: listing the session
//! index, reading snapshots and activity logs, eviction and compaction. The
//! CLI uses it directly; [`TetherClient`](crate::TetherClient) builds on it.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::ready;
use futures::stream::BoxStream;
use std::path::PathBuf;
use tracing::info;

use tether_core::{
    ActivityStorage, CacheLayout, CacheTier, CachedSession, FileSessionStore,
    GlobalCacheMetadata, JsonlActivityStore, MetadataStore, SessionFilter, SessionIndexEntry,
    SessionStorage, SyncConfig, TetherResult, determine_cache_tier,
};

/// Session store, activity logs and metadata under one cache root
pub struct LocalCache {
    sessions: FileSessionStore,
    metadata: MetadataStore,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let sessions = FileSessionStore::new(root);
        let metadata = MetadataStore::new(sessions.layout());
        Self { sessions, metadata }
    }

    /// Cache at the root named by `config` (or the default root)
    pub fn open(config: &SyncConfig) -> TetherResult<Self> {
        Ok(Self::new(config.cache_root()?))
    }

    pub async fn init(&self) -> TetherResult<()> {
        self.sessions.init().await
    }

    pub fn layout(&self) -> &CacheLayout {
        self.sessions.layout()
    }

    pub fn session_store(&self) -> &FileSessionStore {
        &self.sessions
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Read-only view over the session index
    pub fn sessions(&self) -> SessionsView<'_> {
        SessionsView {
            store: &self.sessions,
        }
    }

    pub async fn cached(&self, id: &str) -> TetherResult<Option<CachedSession>> {
        self.sessions.get(id).await
    }

    /// Freshness tier of a cached session, `None` when nothing is cached
    pub async fn tier(&self, id: &str, now: DateTime<Utc>) -> TetherResult<Option<CacheTier>> {
        Ok(self
            .cached(id)
            .await?
            .map(|cached| determine_cache_tier(&cached, now)))
    }

    /// Activity log of one session. Not loaded until first use.
    pub fn activities(&self, session_id: &str) -> TetherResult<JsonlActivityStore> {
        JsonlActivityStore::open(self.layout(), session_id)
    }

    pub async fn status(&self) -> GlobalCacheMetadata {
        self.metadata.load().await
    }

    /// Drop the snapshot and the activity log of a session.
    ///
    /// Its index lines stay; a later sync overwrites them.
    pub async fn evict(&self, id: &str) -> TetherResult<()> {
        let activities = self.activities(id)?;
        self.sessions.delete(id).await?;
        activities.purge().await?;
        activities.close().await?;
        info!("Evicted session {} from the local cache", id);
        Ok(())
    }

    /// Rewrite the session index without superseded lines
    pub async fn compact(&self) -> TetherResult<usize> {
        self.sessions.compact_index().await
    }
}

/// Query side of the session index
#[derive(Clone, Copy)]
pub struct SessionsView<'a> {
    store: &'a FileSessionStore,
}

impl<'a> SessionsView<'a> {
    /// Every cached session, newest write per id. Each call re-reads the index.
    pub fn list(&self) -> BoxStream<'a, SessionIndexEntry> {
        self.store.scan_index()
    }

    /// Entries matching `filter`, up to its limit
    pub async fn find(&self, filter: &SessionFilter) -> Vec<SessionIndexEntry> {
        let limit = filter.limit.unwrap_or(usize::MAX);
        self.list()
            .filter(|entry| ready(filter.matches(entry)))
            .take(limit)
            .collect()
            .await
    }

    /// First entry matching `filter`
    pub async fn get(&self, filter: &SessionFilter) -> Option<SessionIndexEntry> {
        self.list()
            .filter(|entry| ready(filter.matches(entry)))
            .next()
            .await
    }

    /// Number of distinct sessions in the index
    pub async fn count(&self) -> usize {
        self.list().count().await
    }
}
