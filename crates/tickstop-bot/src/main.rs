//! tickstop - depth-feed stop-limit trigger entry point.

use anyhow::Result;
use clap::Parser;
use tickstop_bot::config::CONFIG_ENV;
use tickstop_bot::{AppConfig, Application, CliArgs};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // TLS provider must be installed before the first wss:// connect.
    tickstop_ws::init_crypto();

    let args = CliArgs::parse();

    tickstop_telemetry::init_logging()?;

    info!("Starting tickstop v{}", env!("CARGO_PKG_VERSION"));

    let env_path = std::env::var(CONFIG_ENV).ok();
    let config = AppConfig::from_cli(&args, env_path.as_deref())?;
    info!(
        instrument = %config.trigger.instrument,
        side = %config.trigger.side,
        stop_price = %config.trigger.stop_price,
        "Configuration loaded"
    );

    let app = Application::new(config);
    let outcome = app.run().await?;

    info!(
        order_id = %outcome.order_id,
        events_seen = outcome.events_seen,
        "Stop-limit order placed, exiting"
    );

    Ok(())
}
