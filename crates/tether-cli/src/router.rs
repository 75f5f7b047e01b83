//! Command routing logic for CLI

use anyhow::Context;
use tether_core::SyncConfig;
use tether_sdk::LocalCache;
use tracing::debug;

use crate::args::{Cli, Commands};
use crate::commands;
use crate::console::CliConsole;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let cache = LocalCache::open(&config)?;
    debug!("Using cache at {}", cache.layout().root().display());
    let console = CliConsole::new(cli.verbose);

    match cli.command {
        Commands::Sessions {
            state,
            title,
            source,
            limit,
        } => {
            let filter = commands::sessions::build_filter(state, title, source, limit)?;
            commands::sessions::list(&cache, &console, &filter).await
        }
        Commands::Show { session_id } => commands::sessions::show(&cache, &console, &session_id).await,
        Commands::Activities {
            session_id,
            limit,
            exclude,
        } => commands::activities::list(&cache, &console, &session_id, limit, exclude).await,
        Commands::Status => commands::maintenance::status(&cache, &console).await,
        Commands::Evict { session_id } => {
            commands::maintenance::evict(&cache, &console, &session_id).await
        }
        Commands::Compact => commands::maintenance::compact(&cache, &console).await,
    }
}

/// Config file (if any), then `TETHER_*` variables, then `--cache-dir`
fn load_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    config.apply_env().context("Invalid TETHER_* environment")?;
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    Ok(config)
}
