//! Aquamon - Sensor Telemetry Agent
//!
//! Main entry point for the service.

use anyhow::{bail, Context};
use aquamon::{
    load_config, AttributesCollector, LogSink, MonitoringAgent, SensorFactory, TelemetryCollector,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Aquamon v{} as '{}'", env!("CARGO_PKG_VERSION"), config.device_name);

    if config.sensors.is_empty() {
        bail!("No sensors configured for '{}'", config.device_name);
    }

    let bundles = SensorFactory::new()
        .build_all(&config.sensors_value())
        .context("Invalid sensor list")?;
    if bundles.is_empty() {
        tracing::warn!("None of {} sensor entries could be built", config.sensors.len());
    }

    let collector = TelemetryCollector::new(bundles);
    MonitoringAgent::new(collector, config.poll_interval())
        .with_attributes(AttributesCollector::new(config.device_name.clone()))
        .with_sink(Box::new(LogSink::new(config.device_name.clone())))
        .run()
        .await;

    tracing::info!("Aquamon stopped");
    Ok(())
}
