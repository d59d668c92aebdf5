//! Telemetry collection: due-checking, reading and the transformation pipeline.

pub mod clock;
pub mod collector;
pub mod pipeline;

use crate::sensors::driver::TelemetryValue;
use std::collections::BTreeMap;

/// Flat canonical telemetry produced by one collection cycle.
pub type TelemetryMap = BTreeMap<String, TelemetryValue>;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::TelemetryCollector;
pub use pipeline::EmaStore;
