//! Deduplication cursor for the activity stream

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::types::Activity;

/// Tracks what the stream has already delivered.
///
/// Only the newest timestamp seen so far and the ids delivered at exactly
/// that timestamp are kept, so memory stays bounded by the number of
/// activities sharing one `create_time`.
#[derive(Debug, Clone, Default)]
pub struct StreamCursor {
    last_seen: Option<DateTime<Utc>>,
    seen_ids: HashSet<String>,
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor that treats everything up to `time` as delivered, except
    /// activities at exactly `time` whose id is not in `ids`
    pub fn resume_at(time: DateTime<Utc>, ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            last_seen: Some(time),
            seen_ids: ids.into_iter().collect(),
        }
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Ids already delivered at [`last_seen`](Self::last_seen)
    pub fn seen_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }

    /// Record `activity` and report whether it is new.
    ///
    /// Older than the cursor: skipped. Same time: new only if its id was not
    /// delivered at that time yet. Newer: the cursor advances and the seen set
    /// restarts with this id.
    pub fn admit(&mut self, activity: &Activity) -> bool {
        match self.last_seen {
            Some(last) if activity.create_time < last => false,
            Some(last) if activity.create_time == last => {
                self.seen_ids.insert(activity.id.clone())
            }
            _ => {
                self.last_seen = Some(activity.create_time);
                self.seen_ids.clear();
                self.seen_ids.insert(activity.id.clone());
                true
            }
        }
    }
}
