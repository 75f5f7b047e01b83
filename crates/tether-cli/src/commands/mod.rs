//! CLI command implementations

pub mod activities;
pub mod maintenance;
pub mod sessions;

use chrono::{DateTime, Utc};

/// "3 hours ago" style rendering relative to now
pub fn format_relative_time(time: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(time);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if duration.num_days() < 30 {
        let days = duration.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        let months = duration.num_days() / 30;
        if months < 12 {
            format!("{} month{} ago", months, if months == 1 { "" } else { "s" })
        } else {
            let years = months / 12;
            format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
        }
    }
}

/// Shorten to `max` characters, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
