//! Main entry point for the Pulsegate bridge.

use std::sync::Arc;

use anyhow::Context;
use pulsegate_common::SimulatedDevice;
use pulsegate_server::{BridgeSettings, Configuration, bridge, startup};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new().context("Failed to load configuration")?;

    let logging_config = configuration
        .logging_config()
        .context("Invalid logging configuration")?;
    let _logging_guard = startup::init_logging(&logging_config)?;

    let settings =
        BridgeSettings::from_configuration(&configuration).context("Invalid configuration")?;
    info!(
        channels = settings.channels.len(),
        max_strength = settings.control.max_strength,
        rate_limit_ms = settings.control.rate_limit_interval.as_millis() as u64,
        reset_interval_ms = settings.control.reset_interval.as_millis() as u64,
        listen = %settings.osc.listen,
        "Starting Pulsegate {}",
        env!("CARGO_PKG_VERSION")
    );

    warn!("No hardware driver is built in, using the simulated device");
    let device = Arc::new(SimulatedDevice::new());

    let shutdown = startup::wait_for_shutdown_signal();
    bridge::run(settings, device, shutdown)
        .await
        .context("Bridge failed")?;

    info!("Pulsegate has been shut down");
    Ok(())
}
