//! zbstat - Entry Point
//!
//! Connects to the local status server and prints the tracked
//! progress counters whenever they change.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Live status feed client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ZBSTAT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Status server URL, overrides `ws_url` from the config file
    #[arg(short, long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    zbstat_telemetry::init_logging()?;

    info!("Starting zbstat v{}", env!("CARGO_PKG_VERSION"));

    let mut config = zbstat::AppConfig::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.ws_url = url;
    }
    info!(ws_url = %config.ws_url, "Configuration loaded");

    let app = zbstat::Application::new(config)?;
    app.run().await?;

    Ok(())
}
