//! On-disk layout of the local cache
//!
//! ```text
//! <root>/
//!   sessions.jsonl            append-only session index
//!   metadata.json             global aggregate counters
//!   sessions/
//!     <session-id>/
//!       session.json          latest snapshot + _lastSyncedAt
//!       activities.jsonl      append-only activity log
//! ```

use std::path::{Path, PathBuf};

use crate::error::{TetherError, TetherResult};

const SESSIONS_DIR: &str = "sessions";
const INDEX_FILE: &str = "sessions.jsonl";
const METADATA_FILE: &str = "metadata.json";
const SNAPSHOT_FILE: &str = "session.json";
const ACTIVITIES_FILE: &str = "activities.jsonl";

/// Path arithmetic for a cache rooted at one directory
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default cache root (~/.tether/cache)
    pub fn default_root() -> TetherResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| TetherError::config("Could not determine home directory"))?;
        Ok(home.join(".tether").join("cache"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn session_dir(&self, id: &str) -> TetherResult<PathBuf> {
        validate_id(id)?;
        Ok(self.sessions_dir().join(id))
    }

    pub fn snapshot_path(&self, id: &str) -> TetherResult<PathBuf> {
        Ok(self.session_dir(id)?.join(SNAPSHOT_FILE))
    }

    pub fn activities_path(&self, id: &str) -> TetherResult<PathBuf> {
        Ok(self.session_dir(id)?.join(ACTIVITIES_FILE))
    }
}

/// Ids become directory names, so they must be a single non-empty path segment
pub fn validate_id(id: &str) -> TetherResult<()> {
    if id.trim().is_empty() {
        return Err(TetherError::invalid_field("id", "session id must not be empty"));
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(TetherError::invalid_field(
            "id",
            format!("session id '{}' is not a valid path segment", id),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = CacheLayout::new("/cache");
        assert_eq!(layout.index_path(), PathBuf::from("/cache/sessions.jsonl"));
        assert_eq!(
            layout.snapshot_path("abc").unwrap(),
            PathBuf::from("/cache/sessions/abc/session.json")
        );
        assert_eq!(
            layout.activities_path("abc").unwrap(),
            PathBuf::from("/cache/sessions/abc/activities.jsonl")
        );
    }

    #[test]
    fn test_rejects_bad_ids() {
        let layout = CacheLayout::new("/cache");
        assert!(layout.session_dir("").is_err());
        assert!(layout.session_dir("   ").is_err());
        assert!(layout.session_dir("..").is_err());
        assert!(layout.session_dir("a/b").is_err());
        assert!(layout.session_dir("123456789").is_ok());
    }
}
