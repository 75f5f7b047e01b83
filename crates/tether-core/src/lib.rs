//! Tether core
//!
//! Local-first synchronization and caching for remote coding-agent sessions.
//! The crate keeps a durable, incrementally updated copy of sessions and their
//! activities, and decides for every read whether that copy is fresh enough to
//! answer without asking the remote service.
//!
//! - [`cache`]: freshness tiers (hot, warm, frozen) for cached sessions
//! - [`storage`]: the session index store, per-session activity logs and the
//!   global metadata file
//! - [`sync`]: the activity stream that merges paginated catch-up with live
//!   polling
//! - [`concurrency`], [`polling`], [`recovery`]: batch mapping, predicate
//!   waiting and warm-up retries
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use tether_core::{CacheTier, CachedSession, Session, SessionState, determine_cache_tier};
//!
//! let now = Utc::now();
//! let session = Session::new("s1", SessionState::Completed, now);
//! let cached = CachedSession::new(session, now);
//! assert_eq!(determine_cache_tier(&cached, now), CacheTier::Warm);
//! ```

#![allow(clippy::collapsible_if)]

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod polling;
pub mod recovery;
pub mod storage;
pub mod sync;
pub mod types;

pub use cache::{CacheTier, determine_cache_tier, is_cache_valid};
pub use concurrency::{BatchOptions, batch_map, batch_map_settled};
pub use config::SyncConfig;
pub use error::{BatchFailure, TetherError, TetherResult};
pub use polling::{wait_for, wait_until_terminal};
pub use recovery::RetryConfig;
pub use storage::{
    ActivityStorage, CacheLayout, FileSessionStore, JsonlActivityStore, MetadataStore,
    SessionFilter, SessionStorage,
};
pub use sync::{ActivityPage, ActivityPageFetcher, StreamCursor, StreamOptions, stream_activities};
pub use types::{
    Activity, ActivityEvent, CachedSession, GlobalCacheMetadata, Originator, Session,
    SessionIndexEntry, SessionState, SourceContext,
};
