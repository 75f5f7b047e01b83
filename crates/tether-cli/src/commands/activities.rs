//! Stored activity log output

use colored::*;
use futures::StreamExt;
use std::collections::VecDeque;
use tether_core::{Activity, ActivityEvent, ActivityStorage, Originator};
use tether_sdk::LocalCache;

use super::{format_relative_time, truncate};
use crate::args::OriginatorArg;
use crate::console::CliConsole;

/// Print the activities stored for `session_id`, oldest first
pub async fn list(
    cache: &LocalCache,
    console: &CliConsole,
    session_id: &str,
    limit: Option<usize>,
    exclude: Option<OriginatorArg>,
) -> anyhow::Result<()> {
    let store = cache.activities(session_id)?;
    let excluded = exclude.map(to_originator);

    // keep only the tail when a limit is given
    let capacity = limit.unwrap_or(usize::MAX);
    let mut shown: VecDeque<Activity> = VecDeque::new();
    let mut scan = store.scan();
    while let Some(activity) = scan.next().await {
        let activity = activity?;
        if excluded.is_some() && activity.originator == excluded {
            continue;
        }
        if shown.len() == capacity {
            shown.pop_front();
        }
        if capacity > 0 {
            shown.push_back(activity);
        }
    }

    if shown.is_empty() {
        println!("{}", format!("No stored activities for {}.", session_id).yellow());
        return Ok(());
    }

    console.print_header(&format!("Activities of {}", session_id));
    for activity in &shown {
        let who = activity
            .originator
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {:<7} {:<17} {}",
            format_relative_time(activity.create_time).dimmed(),
            who.cyan(),
            activity.tag().bold(),
            truncate(&summarize(activity), 80)
        );
    }
    console.info(&format!("{} activities shown", shown.len()));
    Ok(())
}

fn to_originator(arg: OriginatorArg) -> Originator {
    match arg {
        OriginatorArg::User => Originator::User,
        OriginatorArg::Agent => Originator::Agent,
        OriginatorArg::System => Originator::System,
    }
}

/// One-line description of an activity's payload
fn summarize(activity: &Activity) -> String {
    let text = match &activity.event {
        ActivityEvent::AgentMessaged { agent_message } => agent_message.clone(),
        ActivityEvent::UserMessaged { user_message } => user_message.clone(),
        ActivityEvent::PlanGenerated { plan } => format!("plan with {} steps", plan.steps.len()),
        ActivityEvent::PlanApproved { plan_id } => format!("approved plan {}", plan_id),
        ActivityEvent::ProgressUpdated { title, .. } => title.clone(),
        ActivityEvent::SessionCompleted {} => "session completed".to_string(),
        ActivityEvent::SessionFailed { reason } => format!("failed: {}", reason),
    };
    text.lines().next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use tether_core::types::{Plan, PlanStep};

    #[test]
    fn test_summarize_uses_first_line() {
        let activity = Activity::agent_message("a1", Utc::now(), "Done.\nDetails follow");
        assert_eq!(summarize(&activity), "Done.");

        let plan = Plan {
            id: "p1".into(),
            steps: vec![PlanStep {
                id: "1".into(),
                title: "Write tests".into(),
                description: None,
                index: 0,
            }],
        };
        let activity = Activity::new("a2", Utc::now(), ActivityEvent::PlanGenerated { plan });
        assert_eq!(summarize(&activity), "plan with 1 steps");
    }

    #[tokio::test]
    async fn test_list_with_limit_and_exclusion() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path());
        cache.init().await.unwrap();
        let store = cache.activities("s1").unwrap();
        store.init().await.unwrap();
        store.append(&Activity::user_message("u1", Utc::now(), "hi")).await.unwrap();
        store.append(&Activity::agent_message("a1", Utc::now(), "hello")).await.unwrap();

        let console = CliConsole::new(true);
        list(&cache, &console, "s1", Some(1), Some(OriginatorArg::User)).await.unwrap();
        list(&cache, &console, "empty", None, None).await.unwrap();
    }
}
