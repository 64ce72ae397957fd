//! Videoflix CLI - Command-line interface
//!
//! Browses the catalog, resolves playable URLs and manages saved progress
//! against a Videoflix backend.

mod commands;

use anyhow::Context;
use clap::Parser;
use videoflix_core::config::VideoflixConfig;
use videoflix_core::tracing_setup::{Verbosity, init_tracing};

#[derive(Parser)]
#[command(name = "videoflix")]
#[command(about = "A streaming client for the Videoflix backend")]
struct Cli {
    /// Console verbosity, VIDEOFLIX_LOG takes precedence
    #[arg(short, long, value_enum, default_value_t = Verbosity::Normal)]
    verbosity: Verbosity,

    /// API base URL, overrides VIDEOFLIX_API_URL
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = VideoflixConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    init_tracing(cli.verbosity, &config.storage).context("Failed to initialize logging")?;

    commands::handle_command(cli.command, config).await
}
