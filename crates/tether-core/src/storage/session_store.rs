//! File-backed session store
//!
//! Snapshots are whole JSON documents, one directory per session. Every write
//! also appends a narrow [`SessionIndexEntry`] line to `sessions.jsonl`, so
//! listing never has to open per-session files. The index is never edited in
//! place; readers collapse it to the newest line per id.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::SessionStorage;
use super::jsonl::{append_jsonl, read_json, read_jsonl, write_atomic, write_json};
use super::layout::CacheLayout;
use crate::error::{TetherError, TetherResult};
use crate::types::{CachedSession, Session, SessionIndexEntry};

/// Session store rooted at a cache directory
pub struct FileSessionStore {
    layout: CacheLayout,
    /// Serializes appends and compaction of the shared index file
    index_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: CacheLayout::new(root),
            index_lock: Mutex::new(()),
        }
    }

    /// Create a store at the default location (~/.tether/cache)
    pub fn default_path() -> TetherResult<Self> {
        Ok(Self::new(CacheLayout::default_root()?))
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    async fn write_snapshot(&self, cached: &CachedSession) -> TetherResult<SessionIndexEntry> {
        let path = self.layout.snapshot_path(&cached.resource.id)?;
        write_json(&path, cached).await?;
        Ok(SessionIndexEntry::from_session(
            &cached.resource,
            cached.last_synced_at,
        ))
    }

    /// Sync time for a new write of `id`: `now`, or the stored time if the
    /// clock went backwards since it was written
    async fn next_synced_at(&self, id: &str, now: DateTime<Utc>) -> TetherResult<DateTime<Utc>> {
        Ok(match self.get(id).await? {
            Some(stored) if stored.last_synced_at > now => stored.last_synced_at,
            _ => now,
        })
    }

    async fn append_index(&self, entries: &[SessionIndexEntry]) -> TetherResult<()> {
        let _guard = self.index_lock.lock().await;
        append_jsonl(&self.layout.index_path(), entries).await
    }
}

/// Collapse index lines to the newest per id, keeping first-seen order.
/// Equal write times resolve to the later line.
pub(crate) fn latest_per_id(entries: Vec<SessionIndexEntry>) -> Vec<SessionIndexEntry> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<SessionIndexEntry> = Vec::new();

    for entry in entries {
        match positions.get(&entry.id) {
            Some(&pos) => {
                if entry.updated_at >= latest[pos].updated_at {
                    latest[pos] = entry;
                }
            }
            None => {
                positions.insert(entry.id.clone(), latest.len());
                latest.push(entry);
            }
        }
    }

    latest
}

#[async_trait]
impl SessionStorage for FileSessionStore {
    async fn init(&self) -> TetherResult<()> {
        let dir = self.layout.sessions_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                TetherError::io_at(format!("Failed to create sessions directory: {}", e), &dir)
            })?;
            info!("Initialized session store at {:?}", self.layout.root());
        }
        Ok(())
    }

    async fn put(&self, cached: &CachedSession) -> TetherResult<()> {
        if let Some(stored) = self.get(&cached.resource.id).await? {
            if stored.last_synced_at > cached.last_synced_at {
                debug!(
                    "Skipping stale write of session {} (synced {} < stored {})",
                    cached.resource.id, cached.last_synced_at, stored.last_synced_at
                );
                return Ok(());
            }
        }

        let entry = self.write_snapshot(cached).await?;
        self.append_index(std::slice::from_ref(&entry)).await?;
        debug!("Stored session {}", cached.resource.id);
        Ok(())
    }

    async fn upsert(&self, session: &Session) -> TetherResult<CachedSession> {
        let synced_at = self.next_synced_at(&session.id, Utc::now()).await?;
        let cached = CachedSession::new(session.clone(), synced_at);
        self.put(&cached).await?;
        Ok(cached)
    }

    async fn upsert_many(&self, sessions: &[Session]) -> TetherResult<Vec<CachedSession>> {
        let mut written = Vec::with_capacity(sessions.len());
        let mut entries = Vec::with_capacity(sessions.len());

        for session in sessions {
            let synced_at = match self.next_synced_at(&session.id, Utc::now()).await {
                Ok(synced_at) => synced_at,
                Err(e) => {
                    self.append_index(&entries).await?;
                    return Err(e);
                }
            };
            let cached = CachedSession::new(session.clone(), synced_at);
            match self.write_snapshot(&cached).await {
                Ok(entry) => {
                    entries.push(entry);
                    written.push(cached);
                }
                Err(e) => {
                    // Index the snapshots that did land before surfacing the failure
                    self.append_index(&entries).await?;
                    return Err(e);
                }
            }
        }

        self.append_index(&entries).await?;
        debug!("Stored {} sessions", written.len());
        Ok(written)
    }

    async fn get(&self, id: &str) -> TetherResult<Option<CachedSession>> {
        let path = self.layout.snapshot_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(read_json::<CachedSession>(&path).await)
    }

    async fn delete(&self, id: &str) -> TetherResult<()> {
        let path = self.layout.snapshot_path(id)?;
        if path.exists() {
            fs::remove_file(&path).await.map_err(|e| {
                TetherError::io_at(format!("Failed to delete snapshot: {}", e), &path)
            })?;
            info!("Deleted cached session {}", id);
        } else {
            warn!("Cached session {} not found", id);
        }
        Ok(())
    }

    fn scan_index(&self) -> BoxStream<'_, SessionIndexEntry> {
        let path = self.layout.index_path();
        Box::pin(stream! {
            let entries = match read_jsonl::<SessionIndexEntry>(&path).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to read session index: {}", e);
                    Vec::new()
                }
            };
            for entry in latest_per_id(entries) {
                yield entry;
            }
        })
    }

    async fn compact_index(&self) -> TetherResult<usize> {
        let _guard = self.index_lock.lock().await;
        let path = self.layout.index_path();

        let entries = read_jsonl::<SessionIndexEntry>(&path).await?;
        let before = entries.len();
        let latest = latest_per_id(entries);
        let dropped = before - latest.len();

        if dropped == 0 {
            return Ok(0);
        }

        let mut buf = String::new();
        for entry in &latest {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }
        write_atomic(&path, buf.as_bytes()).await?;

        info!(
            "Compacted session index: {} lines -> {}",
            before,
            latest.len()
        );
        Ok(dropped)
    }
}
