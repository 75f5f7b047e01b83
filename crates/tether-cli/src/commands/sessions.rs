//! Session listing and inspection

use anyhow::{Context, bail};
use chrono::Utc;
use colored::*;
use tether_core::{CacheTier, SessionFilter, SessionState};
use tether_sdk::LocalCache;

use super::{format_relative_time, truncate};
use crate::console::CliConsole;

/// Build an index filter from command-line options
pub fn build_filter(
    state: Option<String>,
    title: Option<String>,
    source: Option<String>,
    limit: usize,
) -> anyhow::Result<SessionFilter> {
    let mut filter = SessionFilter::new().with_limit(limit);
    if let Some(state) = state {
        let state: SessionState = state.parse().context("Invalid --state")?;
        filter = filter.with_state(state);
    }
    if let Some(title) = title {
        filter = filter.with_title(title);
    }
    if let Some(source) = source {
        filter = filter.with_source(source);
    }
    Ok(filter)
}

/// List cached sessions matching `filter`
pub async fn list(
    cache: &LocalCache,
    console: &CliConsole,
    filter: &SessionFilter,
) -> anyhow::Result<()> {
    let entries = cache.sessions().find(filter).await;

    if entries.is_empty() {
        println!("{}", "No cached sessions found.".yellow());
        return Ok(());
    }

    console.print_header("Sessions");
    let now = Utc::now();
    for entry in &entries {
        let tier = cache.tier(&entry.id, now).await?;
        println!(
            "  {} {} {}",
            entry.id.bright_cyan(),
            truncate(&entry.title, 50).bright_white(),
            tier_label(tier)
        );
        println!(
            "    {} {} {}",
            colored_state(entry.state),
            "|".dimmed(),
            format!("created {}", format_relative_time(entry.create_time)).dimmed()
        );
    }

    println!();
    println!(
        "{}",
        format!("Showing {} session(s)", entries.len()).dimmed()
    );
    Ok(())
}

/// Print one cached snapshot with its tier and activity count
pub async fn show(cache: &LocalCache, console: &CliConsole, session_id: &str) -> anyhow::Result<()> {
    let Some(cached) = cache.cached(session_id).await? else {
        bail!("Session {} is not cached", session_id);
    };
    let tier = cache.tier(session_id, Utc::now()).await?;
    let activities = cache.activities(session_id)?.len().await?;
    let session = &cached.resource;

    console.print_header(&format!("Session {}", session.id));
    if !session.title.is_empty() {
        console.field("Title", &session.title);
    }
    console.field("State", colored_state(session.state));
    console.field("Tier", tier_label(tier));
    console.field(
        "Created",
        format!("{} ({})", session.create_time, format_relative_time(session.create_time)),
    );
    if let Some(updated) = session.update_time {
        console.field("Updated", updated);
    }
    console.field("Last synced", format_relative_time(cached.last_synced_at));
    if let Some(source) = session.source() {
        console.field("Source", source);
    }
    if let Some(url) = &session.url {
        console.field("URL", url);
    }
    console.field("Activities", activities);
    if !session.prompt.is_empty() {
        println!();
        println!("  {}", truncate(&session.prompt, 200).italic());
    }
    Ok(())
}

fn colored_state(state: SessionState) -> ColoredString {
    match state {
        SessionState::Completed => state.as_str().green(),
        SessionState::Failed => state.as_str().red(),
        SessionState::AwaitingPlanApproval | SessionState::AwaitingUserFeedback => {
            state.as_str().yellow()
        }
        _ => state.as_str().blue(),
    }
}

fn tier_label(tier: Option<CacheTier>) -> ColoredString {
    match tier {
        Some(CacheTier::Hot) => "[hot]".red(),
        Some(CacheTier::Warm) => "[warm]".yellow(),
        Some(CacheTier::Frozen) => "[frozen]".cyan(),
        None => "[evicted]".dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tether_core::{Session, SessionStorage};

    #[test]
    fn test_build_filter() {
        let filter = build_filter(Some("IN_PROGRESS".into()), Some("fix".into()), None, 5).unwrap();
        assert_eq!(filter.state, Some(SessionState::InProgress));
        assert_eq!(filter.title_contains.as_deref(), Some("fix"));
        assert_eq!(filter.limit, Some(5));

        assert!(build_filter(Some("sideways".into()), None, None, 5).is_err());
    }

    #[tokio::test]
    async fn test_list_and_show() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path());
        cache.init().await.unwrap();
        let session = Session::new("s1", SessionState::Completed, Utc::now()).with_title("Fix CI");
        cache.session_store().upsert(&session).await.unwrap();

        let console = CliConsole::new(false);
        list(&cache, &console, &SessionFilter::new()).await.unwrap();
        show(&cache, &console, "s1").await.unwrap();
        assert!(show(&cache, &console, "missing").await.is_err());
    }
}
