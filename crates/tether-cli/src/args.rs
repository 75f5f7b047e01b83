//! CLI argument definitions using clap
//!
//! - tether sessions              # List cached sessions
//! - tether show <id>             # Snapshot details and cache tier
//! - tether activities <id>       # Stored activity log
//! - tether status                # Global cache metadata
//! - tether evict <id>            # Drop a session from the cache
//! - tether compact               # Rewrite the session index

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Tether - inspect and maintain the local session cache")]
#[command(version)]
pub struct Cli {
    /// Cache root (defaults to ~/.tether/cache)
    #[arg(long, global = true, env = "TETHER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List cached sessions from the index
    Sessions {
        /// Only sessions in this state (e.g. completed, in_progress)
        #[arg(long)]
        state: Option<String>,

        /// Case-insensitive title search
        #[arg(long)]
        title: Option<String>,

        /// Exact source name
        #[arg(long)]
        source: Option<String>,

        /// Maximum number of sessions to show
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Show a cached session and its cache tier
    Show {
        /// Session ID
        session_id: String,
    },

    /// Print the stored activities of a session
    Activities {
        /// Session ID
        session_id: String,

        /// Show only the last N activities
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Hide activities from this originator
        #[arg(long, value_enum)]
        exclude: Option<OriginatorArg>,
    },

    /// Show global cache metadata
    Status,

    /// Remove a session's snapshot and activity log
    Evict {
        /// Session ID
        session_id: String,
    },

    /// Drop superseded lines from the session index
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginatorArg {
    User,
    Agent,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sessions_with_filters() {
        let cli = Cli::try_parse_from([
            "tether", "--cache-dir", "/tmp/c", "sessions", "--state", "completed", "-n", "5",
        ])
        .unwrap();

        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        match cli.command {
            Commands::Sessions { state, limit, .. } => {
                assert_eq!(state.as_deref(), Some("completed"));
                assert_eq!(limit, 5);
            }
            _ => panic!("expected sessions command"),
        }
    }

    #[test]
    fn test_parse_activities_exclude() {
        let cli = Cli::try_parse_from(["tether", "activities", "s1", "--exclude", "user", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Activities { session_id, exclude, limit } => {
                assert_eq!(session_id, "s1");
                assert_eq!(exclude, Some(OriginatorArg::User));
                assert!(limit.is_none());
            }
            _ => panic!("expected activities command"),
        }
    }
}
