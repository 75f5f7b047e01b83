//! Cache status, eviction and compaction

use colored::*;
use tether_sdk::LocalCache;

use super::format_relative_time;
use crate::console::CliConsole;

pub async fn status(cache: &LocalCache, console: &CliConsole) -> anyhow::Result<()> {
    let metadata = cache.status().await;
    let indexed = cache.sessions().count().await;

    console.print_header("Tether cache");
    console.field("Root", cache.layout().root().display());
    console.field("Indexed", indexed);
    console.field("Last sync count", metadata.session_count);
    match metadata.last_synced_at {
        Some(at) => console.field("Last synced", format!("{} ({})", at, format_relative_time(at))),
        None => console.field("Last synced", "never".dimmed()),
    }
    Ok(())
}

pub async fn evict(cache: &LocalCache, console: &CliConsole, session_id: &str) -> anyhow::Result<()> {
    cache.evict(session_id).await?;
    console.success(&format!("Evicted session {}", session_id));
    Ok(())
}

pub async fn compact(cache: &LocalCache, console: &CliConsole) -> anyhow::Result<()> {
    let dropped = cache.compact().await?;
    if dropped == 0 {
        console.success("Session index is already compact");
    } else {
        console.success(&format!("Dropped {} superseded index line(s)", dropped));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tether_core::{Session, SessionState, SessionStorage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_compact_then_evict() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path());
        cache.init().await.unwrap();
        let session = Session::new("s1", SessionState::Queued, Utc::now());
        cache.session_store().upsert(&session).await.unwrap();
        cache.session_store().upsert(&session).await.unwrap();

        let console = CliConsole::new(false);
        status(&cache, &console).await.unwrap();
        compact(&cache, &console).await.unwrap();
        assert_eq!(cache.compact().await.unwrap(), 0);

        evict(&cache, &console, "s1").await.unwrap();
        assert!(cache.cached("s1").await.unwrap().is_none());
        assert!(evict(&cache, &console, "../x").await.is_err());
    }
}
