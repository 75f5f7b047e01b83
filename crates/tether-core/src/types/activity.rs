//! Activity data structures
//!
//! Activities are immutable events emitted by the remote service while a
//! session runs. Each carries exactly one event payload, encoded on the wire as
//! a single camelCase key (`agentMessaged`, `planGenerated`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Originator {
    User,
    Agent,
    System,
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Originator::User => write!(f, "user"),
            Originator::Agent => write!(f, "agent"),
            Originator::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

/// Event payload of an activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActivityEvent {
    AgentMessaged {
        #[serde(default)]
        agent_message: String,
    },
    UserMessaged {
        #[serde(default)]
        user_message: String,
    },
    PlanGenerated {
        plan: Plan,
    },
    PlanApproved {
        #[serde(default)]
        plan_id: String,
    },
    ProgressUpdated {
        #[serde(default)]
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    SessionCompleted {},
    SessionFailed {
        #[serde(default)]
        reason: String,
    },
}

impl ActivityEvent {
    /// Wire tag of the payload
    pub fn tag(&self) -> &'static str {
        match self {
            ActivityEvent::AgentMessaged { .. } => "agentMessaged",
            ActivityEvent::UserMessaged { .. } => "userMessaged",
            ActivityEvent::PlanGenerated { .. } => "planGenerated",
            ActivityEvent::PlanApproved { .. } => "planApproved",
            ActivityEvent::ProgressUpdated { .. } => "progressUpdated",
            ActivityEvent::SessionCompleted {} => "sessionCompleted",
            ActivityEvent::SessionFailed { .. } => "sessionFailed",
        }
    }
}

/// One event in a session's activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,

    /// Resource name (`sessions/{session}/activities/{id}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordering key
    pub create_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<Originator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub event: ActivityEvent,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<serde_json::Value>,
}

impl Activity {
    pub fn new(id: impl Into<String>, create_time: DateTime<Utc>, event: ActivityEvent) -> Self {
        Self {
            id: id.into(),
            name: None,
            create_time,
            originator: None,
            description: None,
            event,
            artifacts: Vec::new(),
        }
    }

    /// Shorthand for an agent message
    pub fn agent_message(
        id: impl Into<String>,
        create_time: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            create_time,
            ActivityEvent::AgentMessaged {
                agent_message: message.into(),
            },
        )
        .with_originator(Originator::Agent)
    }

    /// Shorthand for a user message
    pub fn user_message(
        id: impl Into<String>,
        create_time: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            create_time,
            ActivityEvent::UserMessaged {
                user_message: message.into(),
            },
        )
        .with_originator(Originator::User)
    }

    pub fn with_originator(mut self, originator: Originator) -> Self {
        self.originator = Some(originator);
        self
    }

    pub fn tag(&self) -> &'static str {
        self.event.tag()
    }
}
