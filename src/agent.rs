//! Monitoring agent: runs collection cycles on a fixed poll period and forwards
//! each cycle's telemetry and device attributes to the configured sinks.
//!
//! T080: Define TelemetrySink trait and LogSink
//! T081: Implement MonitoringAgent poll loop with graceful shutdown
//! T086: Send device attributes every cycle; disable sinks that fail

use crate::attributes::{AttributesCollector, DeviceAttributes};
use crate::telemetry::clock::{Clock, SystemClock};
use crate::telemetry::{TelemetryCollector, TelemetryMap};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

/// Sink errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outbound consumer of a cycle's telemetry (transport client, display, ...).
pub trait TelemetrySink {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Deliver one cycle's telemetry.
    fn send(&mut self, telemetry: &TelemetryMap) -> Result<(), SinkError>;

    /// Deliver device attributes. Sinks without an attribute channel ignore them.
    fn send_attributes(&mut self, _attributes: &DeviceAttributes) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that logs each payload as JSON.
#[derive(Debug, Clone)]
pub struct LogSink {
    device_name: String,
}

impl LogSink {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
        }
    }
}

impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&mut self, telemetry: &TelemetryMap) -> Result<(), SinkError> {
        let payload = serde_json::to_string(telemetry)?;
        tracing::info!("Telemetry from {}: {}", self.device_name, payload);
        Ok(())
    }

    fn send_attributes(&mut self, attributes: &DeviceAttributes) -> Result<(), SinkError> {
        let payload = serde_json::to_string(attributes)?;
        tracing::info!("Attributes from {}: {}", self.device_name, payload);
        Ok(())
    }
}

/// Drives the collector on a poll period.
pub struct MonitoringAgent<C: Clock = SystemClock> {
    collector: TelemetryCollector<C>,
    attributes: Option<AttributesCollector>,
    sinks: Vec<Box<dyn TelemetrySink + Send>>,
    poll_period: Duration,
    cycles: u64,
}

impl<C: Clock> MonitoringAgent<C> {
    pub fn new(collector: TelemetryCollector<C>, poll_period: Duration) -> Self {
        Self {
            collector,
            attributes: None,
            sinks: Vec::new(),
            poll_period,
            cycles: 0,
        }
    }

    /// Add an outbound sink.
    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink + Send>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Also report device attributes every cycle.
    pub fn with_attributes(mut self, attributes: AttributesCollector) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Names of the sinks still enabled.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    pub fn poll_period(&self) -> Duration {
        self.poll_period
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Collect once and hand telemetry, then attributes, to every sink.
    ///
    /// A sink that fails is logged and disabled for the rest of the run.
    pub fn run_cycle(&mut self) -> TelemetryMap {
        let telemetry = self.collector.collect();
        self.cycles += 1;
        tracing::debug!("Cycle {} collected {} values", self.cycles, telemetry.len());

        let attributes = self.attributes.as_ref().map(AttributesCollector::collect);
        if let Some(attributes) = &attributes {
            tracing::debug!("Collected attributes: {:?}", attributes);
        }

        self.sinks.retain_mut(|sink| {
            match deliver(&mut **sink, &telemetry, attributes.as_ref()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Sink '{}' failed, disabling it: {}", sink.name(), e);
                    false
                }
            }
        });

        telemetry
    }

    /// Run cycles until Ctrl-C.
    pub async fn run(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run cycles until `shutdown` resolves. A cycle in progress always completes.
    ///
    /// Driver reads run inline on the runtime thread.
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) {
        tracing::info!(
            "MonitoringAgent started: {} sensors, poll period {:?}",
            self.collector.len(),
            self.poll_period
        );

        let mut ticker = tokio::time::interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested after {} cycles", self.cycles);
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle();
                }
            }
        }
    }
}

fn deliver(
    sink: &mut dyn TelemetrySink,
    telemetry: &TelemetryMap,
    attributes: Option<&DeviceAttributes>,
) -> Result<(), SinkError> {
    sink.send(telemetry)?;
    if let Some(attributes) = attributes {
        sink.send_attributes(attributes)?;
    }
    Ok(())
}
