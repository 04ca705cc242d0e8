//! Command handler layer.
//!
//! ## Files
//! - `admin.rs`: setup/status/security/dev.
//! - `runtime.rs`: query/test/start/dashboard.
//!
//! Handlers parse CLI inputs, drive the orchestrator and print results.
//! Failures of a query or a test run are reported, not returned; only
//! broken setup targets or server errors end the process with an error.

pub mod admin;
pub mod runtime;

use anyhow::Context;
use log::info;

use crate::cli::{Cli, Commands};
use crate::core::config::Settings;
use crate::core::orchestrator::Orchestrator;

pub async fn dispatch(cli: &Cli, settings: Settings) -> anyhow::Result<()> {
    let json = cli.json;
    match &cli.command {
        Commands::Setup => admin::setup(json, &settings),
        Commands::Status => admin::status(json, &settings).await,
        Commands::Security => admin::security(json, &settings),
        Commands::Dev { command } => admin::dev(json, command),
        Commands::Query { query, query_type } => runtime::query(json, settings, query, *query_type).await,
        Commands::Test => runtime::test(json, settings).await,
        Commands::Start { test } => runtime::start(settings, *test).await,
        Commands::Dashboard { serve, port } => runtime::dashboard(json, settings, *serve, *port).await,
    }
}

/// Orchestrator with every component started
pub async fn ready_orchestrator(settings: Settings) -> anyhow::Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(settings);
    orchestrator
        .initialize_system()
        .await
        .context("failed to initialize system")?;
    info!("System initialized");
    Ok(orchestrator)
}
