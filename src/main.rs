use clap::Parser;
use log::{debug, warn};

mod cli;
mod commands;
mod core;
mod instances;
mod output;
mod web;

use crate::cli::Cli;
use crate::core::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, load_error) = match Settings::load(&cli.root) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::with_root(&cli.root), Some(e)),
    };

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(settings.log_filter()));
    if let Some(e) = load_error {
        warn!("Falling back to default settings: {}", e);
    }
    debug!("Workspace root: {}", settings.root.display());

    commands::dispatch(&cli, settings).await
}
