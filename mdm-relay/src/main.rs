use anyhow::{Context, Result};
use clap::Parser;
use mdm_relay::{init_logging, Args, Relay, RelayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::try_from(Args::parse()).context("Invalid configuration")?;

    init_logging(config.log_mode).context("Failed to initialize logging")?;

    tracing::info!("Starting MicroMDM webhook relay");
    config.log_summary();

    let relay = Relay::start(&config)
        .await
        .context("Failed to start relay")?;

    tracing::info!("Point MicroMDM's -command-webhook-url at {}", relay.webhook_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received");
    relay.shutdown().await.context("Failed to stop relay")?;

    Ok(())
}
