//! FleetView API - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fleetview", version, about = "Fleet tracking API server")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "FLEETVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        settings.server.bind = bind;
    }

    init_logging(&settings.logging)?;
    info!("=== FleetView v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(settings).await
}
