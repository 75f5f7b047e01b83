//! Cache freshness tiers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::CachedSession;

/// Sessions older than this are treated as immutable history
pub const FROZEN_AFTER_DAYS: i64 = 30;

/// Terminal sessions verified within this window are trusted
pub const WARM_TTL_HOURS: i64 = 24;

/// Freshness classification of a cached session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Must be re-checked against the remote before use
    Hot,
    /// Terminal and recently verified
    Warm,
    /// Old enough to be treated as immutable
    Frozen,
}

impl CacheTier {
    /// Whether a cached copy in this tier can answer reads without the remote
    pub fn is_usable(&self) -> bool {
        matches!(self, CacheTier::Warm | CacheTier::Frozen)
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Hot => write!(f, "hot"),
            CacheTier::Warm => write!(f, "warm"),
            CacheTier::Frozen => write!(f, "frozen"),
        }
    }
}

/// Classify a cached session. First matching rule wins:
///
/// 1. `Frozen` when the session was created more than 30 days before `now`,
///    whatever its state.
/// 2. `Warm` when the state is terminal and the last full fetch happened less
///    than 24 hours before `now`.
/// 3. `Hot` otherwise.
pub fn determine_cache_tier(cached: &CachedSession, now: DateTime<Utc>) -> CacheTier {
    let age = now - cached.resource.create_time;
    if age > Duration::days(FROZEN_AFTER_DAYS) {
        return CacheTier::Frozen;
    }

    let since_sync = now - cached.last_synced_at;
    if cached.resource.state.is_terminal() && since_sync < Duration::hours(WARM_TTL_HOURS) {
        return CacheTier::Warm;
    }

    CacheTier::Hot
}

/// `true` when a cached copy exists and its tier is usable
pub fn is_cache_valid(cached: Option<&CachedSession>, now: DateTime<Utc>) -> bool {
    cached
        .map(|c| determine_cache_tier(c, now).is_usable())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Session, SessionState};

    const ALL_STATES: [SessionState; 8] = [
        SessionState::Queued,
        SessionState::Planning,
        SessionState::InProgress,
        SessionState::AwaitingPlanApproval,
        SessionState::AwaitingUserFeedback,
        SessionState::Paused,
        SessionState::Completed,
        SessionState::Failed,
    ];

    fn cached(state: SessionState, age: Duration, since_sync: Duration) -> (CachedSession, DateTime<Utc>) {
        let now = Utc::now();
        let session = Session::new("s1", state, now - age);
        (CachedSession::new(session, now - since_sync), now)
    }

    #[test]
    fn test_old_sessions_are_frozen_regardless_of_state() {
        for state in ALL_STATES {
            let (c, now) = cached(state, Duration::days(31), Duration::days(10));
            assert_eq!(determine_cache_tier(&c, now), CacheTier::Frozen, "{}", state);
        }
    }

    #[test]
    fn test_recent_terminal_sessions_are_warm() {
        for state in [SessionState::Completed, SessionState::Failed] {
            let (c, now) = cached(state, Duration::days(30), Duration::hours(23));
            assert_eq!(determine_cache_tier(&c, now), CacheTier::Warm);
        }
    }

    #[test]
    fn test_stale_terminal_sessions_are_hot() {
        let (c, now) = cached(SessionState::Completed, Duration::days(3), Duration::hours(24));
        assert_eq!(determine_cache_tier(&c, now), CacheTier::Hot);
    }

    #[test]
    fn test_active_sessions_are_hot() {
        for state in ALL_STATES.iter().filter(|s| !s.is_terminal()) {
            let (c, now) = cached(*state, Duration::days(1), Duration::seconds(1));
            assert_eq!(determine_cache_tier(&c, now), CacheTier::Hot, "{}", state);
        }
    }

    #[test]
    fn test_exactly_thirty_days_is_not_frozen() {
        let (c, now) = cached(SessionState::InProgress, Duration::days(30), Duration::zero());
        assert_eq!(determine_cache_tier(&c, now), CacheTier::Hot);
    }

    #[test]
    fn test_cache_validity() {
        let now = Utc::now();
        assert!(!is_cache_valid(None, now));

        let (frozen, now) = cached(SessionState::InProgress, Duration::days(45), Duration::days(40));
        assert!(is_cache_valid(Some(&frozen), now));

        let (hot, now) = cached(SessionState::Paused, Duration::hours(2), Duration::minutes(1));
        assert!(!is_cache_valid(Some(&hot), now));
    }
}
