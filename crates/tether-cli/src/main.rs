//! Tether CLI
//!
//! Inspects and maintains the local-first session cache without talking to
//! the remote service.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/tether-cli
//! ```
//!
//! Set `RUST_LOG` (or pass `-v`) for log output.

#![allow(clippy::collapsible_if)]

mod args;
mod commands;
mod console;
mod router;

use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    router::route(cli).await
}
