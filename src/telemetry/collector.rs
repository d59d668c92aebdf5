//! Telemetry collector: runs one collection cycle over all sensor bundles.
//!
//! T060: Implement TelemetryCollector with per-bundle interval gating
//! T061: Implement read failure isolation
//! T062: Merge bundle output (last write wins)

use crate::sensors::bundle::SensorBundle;
use crate::telemetry::clock::{Clock, SystemClock};
use crate::telemetry::pipeline::{self, EmaStore};
use crate::telemetry::TelemetryMap;
use std::collections::HashMap;

/// Collects canonical telemetry from a fixed set of bundles.
///
/// The collector exclusively owns its cross-cycle state: the last successful
/// read time per bundle identity and the EMA accumulators.
#[derive(Debug)]
pub struct TelemetryCollector<C: Clock = SystemClock> {
    /// Bundles in declaration order
    bundles: Vec<SensorBundle>,
    /// Bundle identity -> time of last successful read
    last_read: HashMap<String, f64>,
    /// Smoothing accumulators
    ema: EmaStore,
    /// Time source
    clock: C,
}

impl TelemetryCollector<SystemClock> {
    /// Create a collector driven by the wall clock.
    pub fn new(bundles: Vec<SensorBundle>) -> Self {
        Self::with_clock(bundles, SystemClock)
    }
}

impl<C: Clock> TelemetryCollector<C> {
    /// Create a collector with a custom time source.
    pub fn with_clock(bundles: Vec<SensorBundle>, clock: C) -> Self {
        Self {
            bundles,
            last_read: HashMap::new(),
            ema: EmaStore::new(),
            clock,
        }
    }

    /// Run one cycle at the clock's current time.
    pub fn collect(&mut self) -> TelemetryMap {
        let now = self.clock.now();
        self.collect_at(now)
    }

    /// Run one cycle at `now` (seconds).
    ///
    /// Bundles that are not due, or whose read fails, contribute nothing.
    /// A failed read does not advance the bundle's last-read time, so it is
    /// retried on the next cycle regardless of its interval.
    pub fn collect_at(&mut self, now: f64) -> TelemetryMap {
        let mut telemetry = TelemetryMap::new();

        for bundle in &mut self.bundles {
            let identity = bundle.identity().to_string();

            if !is_due(&self.last_read, &identity, now, bundle.interval()) {
                tracing::trace!("Skipping {}: not due", identity);
                continue;
            }

            let raw = match bundle.driver_mut().read() {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Read failed for {}: {}", identity, e);
                    continue;
                }
            };

            let mapped = pipeline::map_keys(bundle, raw);
            let calibrated = pipeline::apply_calibration(bundle, mapped);
            let smoothed = self.ema.smooth(&identity, bundle.smoothing(), calibrated);
            let ranged = pipeline::apply_ranges(bundle, smoothed);

            self.last_read.insert(identity, now);

            for (key, value) in ranged {
                if let Some(previous) = telemetry.insert(key.clone(), value) {
                    tracing::debug!("'{}' overwritten: {} -> {}", key, previous, value);
                }
            }
        }

        telemetry
    }

    /// Bundles in declaration order.
    pub fn bundles(&self) -> &[SensorBundle] {
        &self.bundles
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// A bundle without an interval is always due; otherwise once `interval` seconds
/// have passed since its last successful read.
fn is_due(last_read: &HashMap<String, f64>, identity: &str, now: f64, interval: Option<u64>) -> bool {
    match interval {
        None | Some(0) => true,
        Some(interval) => last_read
            .get(identity)
            .map_or(true, |last| now - last >= interval as f64),
    }
}
