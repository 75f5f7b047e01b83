//! Tether SDK
//!
//! Wires a remote coding-agent service to the local-first cache in
//! `tether-core`. Construct one [`TetherClient`] from a [`SyncConfig`] and
//! something implementing [`RemoteApi`]; it answers session reads from the
//! cache when the cached copy is fresh enough, writes every remote read
//! through, and keeps per-session activity logs in sync.
//!
//! [`LocalCache`] offers the remote-free half (listing, eviction,
//! compaction) on its own.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_sdk::{RemoteApi, SyncConfig, TetherClient};
//!
//! # async fn run(remote: Arc<dyn RemoteApi>) -> tether_sdk::TetherResult<()> {
//! let client = TetherClient::new(SyncConfig::from_env()?, remote)?;
//! client.init().await?;
//!
//! let session = client.session("1234567").await?;
//! let appended = client.sync_activities(&session.id).await?;
//! println!("{} new activities", appended);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::collapsible_if)]

pub mod cache;
pub mod client;
pub mod remote;

pub use cache::{LocalCache, SessionsView};
pub use client::{SyncReport, TetherClient};
pub use remote::RemoteApi;

// Re-export commonly used types from core
pub use tether_core::{
    Activity, ActivityPage, CacheTier, CachedSession, GlobalCacheMetadata, Originator,
    RetryConfig, Session, SessionFilter, SessionIndexEntry, SessionState, StreamOptions,
    SyncConfig, TetherError, TetherResult,
};
