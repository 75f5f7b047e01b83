//! Session data structures
//!
//! - Session: remote snapshot of a unit of agent work
//! - CachedSession: snapshot plus the local time it was last fetched
//! - SessionIndexEntry: narrow projection appended to the session index
//! - GlobalCacheMetadata: repo-wide aggregate counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TetherError;

/// Lifecycle state reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[serde(alias = "QUEUED")]
    Queued,
    #[serde(alias = "PLANNING")]
    Planning,
    #[serde(alias = "IN_PROGRESS")]
    InProgress,
    #[serde(alias = "AWAITING_PLAN_APPROVAL")]
    AwaitingPlanApproval,
    #[serde(alias = "AWAITING_USER_FEEDBACK")]
    AwaitingUserFeedback,
    #[serde(alias = "PAUSED")]
    Paused,
    #[serde(alias = "COMPLETED")]
    Completed,
    #[serde(alias = "FAILED")]
    Failed,
    /// Any state this client does not know about
    #[serde(other)]
    Unspecified,
}

impl SessionState {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Queued => "queued",
            SessionState::Planning => "planning",
            SessionState::InProgress => "inProgress",
            SessionState::AwaitingPlanApproval => "awaitingPlanApproval",
            SessionState::AwaitingUserFeedback => "awaitingUserFeedback",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; accepts `inProgress`, `IN_PROGRESS` and `in_progress`.
impl FromStr for SessionState {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        let state = match normalized.as_str() {
            "queued" => SessionState::Queued,
            "planning" => SessionState::Planning,
            "inprogress" => SessionState::InProgress,
            "awaitingplanapproval" => SessionState::AwaitingPlanApproval,
            "awaitinguserfeedback" => SessionState::AwaitingUserFeedback,
            "paused" => SessionState::Paused,
            "completed" => SessionState::Completed,
            "failed" => SessionState::Failed,
            "unspecified" | "stateunspecified" => SessionState::Unspecified,
            _ => {
                return Err(TetherError::invalid_field(
                    "state",
                    format!("unknown session state '{}'", s),
                ));
            }
        };
        Ok(state)
    }
}

/// Case-insensitive terminal check for raw state strings
pub fn is_terminal_state(state: &str) -> bool {
    state
        .parse::<SessionState>()
        .map(|s| s.is_terminal())
        .unwrap_or(false)
}

/// Repository the session works against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    /// Source resource name, e.g. `sources/github/owner/repo`
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_branch: Option<String>,
}

/// Remote snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier
    pub id: String,

    /// Resource name (`sessions/{id}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub prompt: String,

    pub state: SessionState,

    /// Creation timestamp, immutable
    pub create_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Opaque outputs (pull requests, patches)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<serde_json::Value>,
}

impl Session {
    /// Minimal snapshot, mostly useful for tests and fakes
    pub fn new(id: impl Into<String>, state: SessionState, create_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: None,
            title: String::new(),
            prompt: String::new(),
            state,
            create_time,
            update_time: None,
            source_context: None,
            url: None,
            outputs: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_context = Some(SourceContext {
            source: source.into(),
            starting_branch: None,
        });
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source_context.as_ref().map(|c| c.source.as_str())
    }
}

/// Snapshot as persisted locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub resource: Session,

    /// Local time of the last successful full fetch
    #[serde(rename = "_lastSyncedAt")]
    pub last_synced_at: DateTime<Utc>,
}

impl CachedSession {
    pub fn new(resource: Session, last_synced_at: DateTime<Utc>) -> Self {
        Self {
            resource,
            last_synced_at,
        }
    }
}

/// One line of the append-only session index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndexEntry {
    pub id: String,

    #[serde(default)]
    pub title: String,

    pub state: SessionState,

    pub create_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Local write time; the greatest one per id is authoritative
    #[serde(rename = "_updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl SessionIndexEntry {
    pub fn from_session(session: &Session, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            state: session.state,
            create_time: session.create_time,
            source: session.source().map(str::to_string),
            updated_at,
        }
    }
}

/// Aggregate counters kept outside the per-session layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCacheMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub session_count: usize,
}
