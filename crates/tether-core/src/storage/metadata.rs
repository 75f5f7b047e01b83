//! Global cache metadata (`metadata.json`)

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::debug;

use super::jsonl::{read_json, write_json};
use super::layout::CacheLayout;
use crate::error::TetherResult;
use crate::types::GlobalCacheMetadata;

/// Reads and writes the aggregate counters file
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(layout: &CacheLayout) -> Self {
        Self {
            path: layout.metadata_path(),
        }
    }

    /// Current counters; missing or corrupt files read as the default
    pub async fn load(&self) -> GlobalCacheMetadata {
        read_json::<GlobalCacheMetadata>(&self.path)
            .await
            .unwrap_or_default()
    }

    pub async fn save(&self, metadata: &GlobalCacheMetadata) -> TetherResult<()> {
        write_json(&self.path, metadata).await?;
        debug!("Saved cache metadata to {:?}", self.path);
        Ok(())
    }

    /// Record a completed sync run
    pub async fn record_sync(
        &self,
        session_count: usize,
        now: DateTime<Utc>,
    ) -> TetherResult<GlobalCacheMetadata> {
        let mut metadata = self.load().await;
        metadata.session_count = session_count;
        metadata.last_synced_at = Some(match metadata.last_synced_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
        self.save(&metadata).await?;
        Ok(metadata)
    }
}
