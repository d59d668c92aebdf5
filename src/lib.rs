//! Aquamon - Sensor Telemetry Agent
//!
//! Builds sensor drivers from declarative configuration, reads them on a poll
//! period and turns raw readings into canonical telemetry: key mapping,
//! calibration, EMA smoothing and range filtering.

pub mod agent;
pub mod attributes;
pub mod config;
pub mod sensors;
pub mod telemetry;

// Re-export commonly used types
pub use agent::{LogSink, MonitoringAgent, SinkError, TelemetrySink};
pub use attributes::{AttributesCollector, DeviceAttributes};
pub use config::{load_config, ConfigError, ServiceConfig};
pub use sensors::bundle::SensorBundle;
pub use sensors::driver::{SensorDriver, TelemetryValue};
pub use sensors::error::FactoryError;
pub use sensors::factory::SensorFactory;
pub use telemetry::collector::TelemetryCollector;
pub use telemetry::TelemetryMap;
