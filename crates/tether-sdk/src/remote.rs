//! The remote service as seen by the sync core
//!
//! Transport and authentication live outside this crate. Anything that can
//! fetch a session snapshot and list its activities page by page can back a
//! [`TetherClient`](crate::TetherClient).

use async_trait::async_trait;
use tether_core::{ActivityPage, ActivityPageFetcher, Session, TetherResult};

/// Remote session API consumed by the client
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Current snapshot of a session.
    ///
    /// Unknown ids are reported as `TetherError::NotFound`.
    async fn get_session(&self, id: &str) -> TetherResult<Session>;

    /// One page of a session's activities, oldest first.
    ///
    /// A session that was just created may not be listable yet; that must
    /// also surface as `TetherError::NotFound`.
    async fn list_activities(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage>;
}

#[async_trait]
impl ActivityPageFetcher for dyn RemoteApi {
    async fn fetch_page(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage> {
        self.list_activities(session_id, page_token, page_size).await
    }
}
