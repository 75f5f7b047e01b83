//! Local persistence for sessions and activities
//!
//! Two stores share one cache root (see [`CacheLayout`]):
//! - [`FileSessionStore`]: per-session snapshots plus an append-only index that
//!   is read back "last write wins"
//! - [`JsonlActivityStore`]: one append-only, insertion-ordered log per session
//!
//! [`MetadataStore`] keeps the global counters next to them.

mod activity_store;
mod jsonl;
mod layout;
mod metadata;
mod session_store;

pub use activity_store::JsonlActivityStore;
pub use layout::{CacheLayout, validate_id};
pub use metadata::MetadataStore;
pub use session_store::FileSessionStore;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TetherResult;
use crate::types::{Activity, CachedSession, Session, SessionIndexEntry, SessionState};

/// Filter criteria for index lookups
#[derive(Debug, Default, Clone)]
pub struct SessionFilter {
    /// Exact session id
    pub id: Option<String>,

    /// Only sessions in this state
    pub state: Option<SessionState>,

    /// Case-insensitive search in title
    pub title_contains: Option<String>,

    /// Exact source resource name
    pub source: Option<String>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl SessionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_title(mut self, search: impl Into<String>) -> Self {
        self.title_contains = Some(search.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an index entry matches this filter
    pub fn matches(&self, entry: &SessionIndexEntry) -> bool {
        if let Some(ref id) = self.id {
            if &entry.id != id {
                return false;
            }
        }

        if let Some(state) = self.state {
            if entry.state != state {
                return false;
            }
        }

        if let Some(ref source) = self.source {
            if entry.source.as_ref() != Some(source) {
                return false;
            }
        }

        if let Some(ref search) = self.title_contains {
            if !entry.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

/// Session snapshot storage with an append-only index
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Ensure the storage location exists. Idempotent.
    async fn init(&self) -> TetherResult<()>;

    /// Write a snapshot with an explicit sync time and append its index line.
    ///
    /// A write whose sync time is older than the stored snapshot's is ignored.
    async fn put(&self, cached: &CachedSession) -> TetherResult<()>;

    /// Overwrite the snapshot for `session.id`, stamped with the current time,
    /// and append one index line derived from it. The stamp never falls below
    /// the stored snapshot's sync time.
    async fn upsert(&self, session: &Session) -> TetherResult<CachedSession>;

    /// Batched `upsert`; each item is written completely or not at all
    async fn upsert_many(&self, sessions: &[Session]) -> TetherResult<Vec<CachedSession>>;

    /// Latest snapshot, or `None` when absent or unreadable
    async fn get(&self, id: &str) -> TetherResult<Option<CachedSession>>;

    /// Remove the snapshot. Index lines already appended are left alone.
    async fn delete(&self, id: &str) -> TetherResult<()>;

    /// One entry per distinct id, reflecting its most recent append.
    ///
    /// Lazy: nothing is read until the stream is polled. Restartable: every
    /// call reads the index again.
    fn scan_index(&self) -> BoxStream<'_, SessionIndexEntry>;

    /// Rewrite the index keeping only the latest line per id. Returns the
    /// number of lines dropped. `scan_index` output is unchanged by this.
    async fn compact_index(&self) -> TetherResult<usize>;
}

/// Append-only activity log for a single session
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    /// Ensure the log location exists and warm the in-process cache
    async fn init(&self) -> TetherResult<()>;

    /// Release the in-process cache; later reads reflect only persisted state
    async fn close(&self) -> TetherResult<()>;

    /// Append an activity. Re-appending an existing id replaces that entry's
    /// content in place and leaves every other entry untouched.
    async fn append(&self, activity: &Activity) -> TetherResult<()>;

    async fn get(&self, id: &str) -> TetherResult<Option<Activity>>;

    /// Most recently appended activity (the local sync high-water mark).
    /// Not necessarily the one with the greatest `create_time`.
    async fn latest(&self) -> TetherResult<Option<Activity>>;

    /// Lazy, insertion-ordered traversal of the whole log
    fn scan(&self) -> BoxStream<'_, TetherResult<Activity>>;
}
