//! JSONL activity log for one session
//!
//! The file only ever grows. Re-appending an id writes another line; on load
//! the first line for an id fixes its position and the last line supplies its
//! content, which gives upsert-in-place semantics without rewriting the file.

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::ActivityStorage;
use super::jsonl::{append_jsonl, read_jsonl};
use super::layout::CacheLayout;
use crate::error::{TetherError, TetherResult};
use crate::types::Activity;

/// In-process view of the log
#[derive(Debug, Default)]
struct ActivityLog {
    entries: Vec<Activity>,
    positions: HashMap<String, usize>,
}

impl ActivityLog {
    fn from_records(records: Vec<Activity>) -> Self {
        let mut log = Self::default();
        for activity in records {
            log.upsert(activity);
        }
        log
    }

    fn upsert(&mut self, activity: Activity) {
        match self.positions.get(&activity.id) {
            Some(&pos) => self.entries[pos] = activity,
            None => {
                self.positions.insert(activity.id.clone(), self.entries.len());
                self.entries.push(activity);
            }
        }
    }
}

/// Activity store backed by `sessions/<id>/activities.jsonl`
pub struct JsonlActivityStore {
    session_id: String,
    path: PathBuf,
    cache: Mutex<Option<ActivityLog>>,
}

impl JsonlActivityStore {
    /// Open the log of `session_id` under a cache layout
    pub fn open(layout: &CacheLayout, session_id: &str) -> TetherResult<Self> {
        let path = layout.activities_path(session_id)?;
        Ok(Self {
            session_id: session_id.to_string(),
            path,
            cache: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct activities
    pub async fn len(&self) -> TetherResult<usize> {
        self.ensure_loaded().await?;
        Ok(self.cache.lock().as_ref().map_or(0, |log| log.entries.len()))
    }

    pub async fn is_empty(&self) -> TetherResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Delete the log file and drop the cache
    pub async fn purge(&self) -> TetherResult<()> {
        *self.cache.lock() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).await.map_err(|e| {
                TetherError::io_at(format!("Failed to delete activity log: {}", e), &self.path)
            })?;
            info!("Purged activity log for session {}", self.session_id);
        }
        Ok(())
    }

    async fn ensure_loaded(&self) -> TetherResult<()> {
        if self.cache.lock().is_some() {
            return Ok(());
        }

        let records = read_jsonl::<Activity>(&self.path).await?;
        let log = ActivityLog::from_records(records);
        debug!(
            "Loaded {} activities for session {}",
            log.entries.len(),
            self.session_id
        );

        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(log);
        }
        Ok(())
    }

    fn with_log<T>(&self, f: impl FnOnce(&ActivityLog) -> T) -> T {
        let cache = self.cache.lock();
        match cache.as_ref() {
            Some(log) => f(log),
            None => f(&ActivityLog::default()),
        }
    }
}

#[async_trait]
impl ActivityStorage for JsonlActivityStore {
    async fn init(&self) -> TetherResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                TetherError::io_at(format!("Failed to create session directory: {}", e), parent)
            })?;
        }
        self.ensure_loaded().await
    }

    async fn close(&self) -> TetherResult<()> {
        *self.cache.lock() = None;
        debug!("Closed activity store for session {}", self.session_id);
        Ok(())
    }

    async fn append(&self, activity: &Activity) -> TetherResult<()> {
        if activity.id.is_empty() {
            return Err(TetherError::invalid_field("id", "activity id must not be empty"));
        }

        self.ensure_loaded().await?;
        append_jsonl(&self.path, std::slice::from_ref(activity)).await?;

        if let Some(log) = self.cache.lock().as_mut() {
            log.upsert(activity.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> TetherResult<Option<Activity>> {
        self.ensure_loaded().await?;
        Ok(self.with_log(|log| {
            log.positions
                .get(id)
                .map(|&pos| log.entries[pos].clone())
        }))
    }

    async fn latest(&self) -> TetherResult<Option<Activity>> {
        self.ensure_loaded().await?;
        Ok(self.with_log(|log| log.entries.last().cloned()))
    }

    fn scan(&self) -> BoxStream<'_, TetherResult<Activity>> {
        Box::pin(stream! {
            match self.ensure_loaded().await {
                Ok(()) => {
                    let snapshot = self.with_log(|log| log.entries.clone());
                    for activity in snapshot {
                        yield Ok(activity);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }
}
