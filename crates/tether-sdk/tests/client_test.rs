//! Client integration tests against an in-process remote

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use tether_core::ActivityStorage;
use tether_sdk::{
    Activity, ActivityPage, RemoteApi, RetryConfig, Session, SessionFilter, SessionState,
    SyncConfig, TetherClient, TetherError, TetherResult,
};

/// Remote with scripted session snapshots and an activity list per session
#[derive(Default)]
struct FakeRemote {
    /// Successive snapshots per id; the last one repeats
    sessions: Mutex<HashMap<String, VecDeque<Session>>>,
    activities: Mutex<HashMap<String, Vec<Activity>>>,
    /// Number of initial listing calls answered with "not found"
    not_visible_for: AtomicU32,
    session_fetches: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl FakeRemote {
    fn add_session(&self, session: Session) {
        self.sessions
            .lock()
            .entry(session.id.clone())
            .or_default()
            .push_back(session);
    }

    fn push_activity(&self, session_id: &str, activity: Activity) {
        self.activities
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .push(activity);
    }

    fn session_fetches(&self) -> usize {
        self.session_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn get_session(&self, id: &str) -> TetherResult<Session> {
        self.session_fetches.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock();
        let script = sessions
            .get_mut(id)
            .ok_or_else(|| TetherError::not_found_resource("session", id))?;
        if script.len() > 1 {
            if let Some(next) = script.pop_front() {
                return Ok(next);
            }
        }
        script
            .front()
            .cloned()
            .ok_or_else(|| TetherError::not_found_resource("session", id))
    }

    async fn list_activities(
        &self,
        session_id: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> TetherResult<ActivityPage> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let hidden = self.not_visible_for.load(Ordering::SeqCst);
        if hidden > 0 {
            self.not_visible_for.store(hidden - 1, Ordering::SeqCst);
            return Err(TetherError::not_found_resource("session", session_id));
        }

        let all = self
            .activities
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let size = page_size.unwrap_or(50) as usize;
        let end = (start + size).min(all.len());

        let page = ActivityPage::new(all[start.min(end)..end].to_vec());
        Ok(if end < all.len() {
            page.with_next_page_token(end.to_string())
        } else {
            page
        })
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn activity(secs: i64, id: &str) -> Activity {
    Activity::agent_message(id, base_time() + ChronoDuration::seconds(secs), id)
}

fn setup(page_size: u32) -> (TetherClient, Arc<FakeRemote>, TempDir) {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    let config = SyncConfig::default()
        .with_cache_dir(temp.path())
        .with_page_size(page_size)
        .with_polling_interval(Duration::from_secs(5))
        .with_warmup_retry(RetryConfig::limited(5).with_initial_delay(Duration::from_millis(10)));
    let client = TetherClient::new(config, remote.clone()).unwrap();
    (client, remote, temp)
}

#[tokio::test]
async fn test_completed_session_is_served_from_cache() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("s1", SessionState::Completed, Utc::now()).with_title("Fix CI"));

    let first = client.session("s1").await.unwrap();
    let second = client.session("s1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(remote.session_fetches(), 1);
}

#[tokio::test]
async fn test_active_session_is_refetched() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("s1", SessionState::InProgress, Utc::now()));

    client.session("s1").await.unwrap();
    client.session("s1").await.unwrap();

    assert_eq!(remote.session_fetches(), 2);
}

#[tokio::test]
async fn test_old_session_is_frozen_regardless_of_state() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    let created = Utc::now() - ChronoDuration::days(45);
    remote.add_session(Session::new("old", SessionState::InProgress, created));

    client.session("old").await.unwrap();
    client.session("old").await.unwrap();

    assert_eq!(remote.session_fetches(), 1);
}

#[tokio::test]
async fn test_missing_session_and_empty_id() {
    let (client, _remote, _temp) = setup(50);
    client.init().await.unwrap();

    assert!(client.session("nope").await.unwrap_err().is_not_found());
    assert!(matches!(
        client.refresh_session("").await.unwrap_err(),
        TetherError::InvalidInput { .. }
    ));
}

#[tokio::test]
async fn test_sync_sessions_reports_partial_failure() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("a", SessionState::Completed, Utc::now()));
    remote.add_session(Session::new("b", SessionState::Queued, Utc::now()));

    let ids = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
    let report = client.sync_sessions(&ids).await.unwrap();

    assert_eq!(report.synced, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "missing");
    assert!(!report.is_complete());

    let status = client.cache_status().await;
    assert_eq!(status.session_count, 2);
    assert!(status.last_synced_at.is_some());
}

#[tokio::test]
async fn test_sessions_view_filters_index() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("a", SessionState::Completed, Utc::now()).with_title("Fix flaky test"));
    remote.add_session(Session::new("b", SessionState::Failed, Utc::now()).with_title("Bump deps"));
    remote.add_session(Session::new("c", SessionState::Completed, Utc::now()).with_title("Fix docs"));
    client
        .sync_sessions(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();

    let listed: Vec<_> = client.sessions().list().collect().await;
    assert_eq!(listed.len(), 3);

    let failed = client
        .sessions()
        .get(&SessionFilter::new().with_state(SessionState::Failed))
        .await
        .unwrap();
    assert_eq!(failed.id, "b");

    let fixes = client
        .sessions()
        .find(&SessionFilter::new().with_title("fix").with_limit(5))
        .await;
    assert_eq!(fixes.len(), 2);

    assert!(client
        .sessions()
        .get(&SessionFilter::new().with_id("zzz"))
        .await
        .is_none());
}

#[tokio::test]
async fn test_sync_activities_is_incremental() {
    let (client, remote, _temp) = setup(2);
    client.init().await.unwrap();
    for (secs, id) in [(1, "a1"), (2, "a2"), (3, "a3")] {
        remote.push_activity("s1", activity(secs, id));
    }

    assert_eq!(client.sync_activities("s1").await.unwrap(), 3);

    remote.push_activity("s1", activity(4, "a4"));
    assert_eq!(client.sync_activities("s1").await.unwrap(), 1);
    assert_eq!(client.sync_activities("s1").await.unwrap(), 0);

    let store = client.cache().activities("s1").unwrap();
    assert_eq!(store.len().await.unwrap(), 4);
    assert_eq!(store.latest().await.unwrap().unwrap().id, "a4");
}

#[tokio::test]
async fn test_sync_activities_keeps_boundary_ties() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.push_activity("s1", activity(1, "x"));
    remote.push_activity("s1", activity(1, "y"));
    assert_eq!(client.sync_activities("s1").await.unwrap(), 2);

    // a late arrival sharing the high-water timestamp is still picked up
    remote.push_activity("s1", activity(1, "z"));
    assert_eq!(client.sync_activities("s1").await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sync_activities_waits_for_new_session() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.not_visible_for.store(3, Ordering::SeqCst);
    remote.push_activity("s1", activity(1, "a1"));

    assert_eq!(client.sync_activities("s1").await.unwrap(), 1);
    assert_eq!(remote.listing_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_follow_activities_persists_before_yielding() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.push_activity("s1", activity(1, "a1"));

    let mut stream = client.follow_activities("s1", client.stream_options());
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.id, "a1");

    let store = client.cache().activities("s1").unwrap();
    assert!(store.get("a1").await.unwrap().is_some());

    remote.push_activity("s1", activity(2, "a2"));
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.id, "a2");
    drop(stream);

    store.close().await.unwrap();
    assert_eq!(store.len().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_until_terminal_writes_through() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    let created = Utc::now();
    for state in [SessionState::Queued, SessionState::InProgress, SessionState::Completed] {
        remote.add_session(Session::new("s1", state, created));
    }

    let done = client
        .wait_until_terminal("s1", Duration::from_secs(1), Some(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(done.state, SessionState::Completed);
    assert_eq!(remote.session_fetches(), 3);
    let cached = client.cache().cached("s1").await.unwrap().unwrap();
    assert_eq!(cached.resource.state, SessionState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_wait_until_terminal_times_out() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("s1", SessionState::InProgress, Utc::now()));

    let err = client
        .wait_until_terminal("s1", Duration::from_secs(1), Some(Duration::from_secs(3)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_evict_drops_snapshot_and_activities() {
    let (client, remote, _temp) = setup(50);
    client.init().await.unwrap();
    remote.add_session(Session::new("s1", SessionState::Completed, Utc::now()));
    remote.push_activity("s1", activity(1, "a1"));
    client.session("s1").await.unwrap();
    client.sync_activities("s1").await.unwrap();

    client.evict("s1").await.unwrap();

    assert!(client.cache().cached("s1").await.unwrap().is_none());
    let store = client.cache().activities("s1").unwrap();
    assert!(store.is_empty().await.unwrap());

    // the next read goes back to the remote
    client.session("s1").await.unwrap();
    assert_eq!(remote.session_fetches(), 2);
}
