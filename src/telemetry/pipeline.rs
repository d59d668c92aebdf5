//! Per-bundle transformation stages: key mapping, calibration, smoothing, range filtering.
//!
//! T050: Implement key mapping and calibration
//! T051: Implement EMA smoothing store
//! T052: Implement range filtering (drop, never clamp)

use crate::sensors::bundle::SensorBundle;
use crate::sensors::driver::{Reading, TelemetryValue};
use std::collections::HashMap;

/// Rename mapped raw keys to canonical keys; unmapped keys are dropped.
pub fn map_keys(bundle: &SensorBundle, raw: Reading) -> Reading {
    let mut mapped = Reading::new();

    for (raw_key, value) in raw {
        match bundle.keys().get(&raw_key) {
            Some(canonical) => {
                mapped.insert(canonical.clone(), value);
            }
            None => {
                tracing::debug!("Unmapped key '{}' from {}", raw_key, bundle.driver().kind());
            }
        }
    }

    mapped
}

/// Apply `value * slope + offset` to numeric values that have a calibration entry.
pub fn apply_calibration(bundle: &SensorBundle, mapped: Reading) -> Reading {
    mapped
        .into_iter()
        .map(|(key, value)| {
            let calibrated = match (bundle.calibration().get(&key), value) {
                (Some(calibration), TelemetryValue::Number(n)) => {
                    TelemetryValue::Number(calibration.apply(n))
                }
                (Some(_), other) => {
                    tracing::debug!(
                        "Non-numeric value '{}' for '{}' from {} left uncalibrated",
                        other,
                        key,
                        bundle.driver().kind()
                    );
                    other
                }
                (None, other) => other,
            };
            (key, calibrated)
        })
        .collect()
}

/// Drop numeric values outside their inclusive range.
pub fn apply_ranges(bundle: &SensorBundle, values: Reading) -> Reading {
    values
        .into_iter()
        .filter(|(key, value)| {
            let (Some(range), Some(n)) = (bundle.ranges().get(key), value.as_number()) else {
                return true;
            };
            if range.contains(n) {
                true
            } else {
                tracing::debug!(
                    "Value {} for '{}' outside [{}, {}] from {}",
                    n,
                    key,
                    range.min,
                    range.max,
                    bundle.driver().kind()
                );
                false
            }
        })
        .collect()
}

/// Smoothing factor for an EMA window.
pub fn ema_alpha(window: u64) -> f64 {
    2.0 / (window as f64 + 1.0)
}

/// Exponential moving average accumulators keyed by (bundle identity, canonical key).
#[derive(Debug, Default)]
pub struct EmaStore {
    values: HashMap<(String, String), f64>,
}

impl EmaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smooth numeric values whose window is at least 2.
    ///
    /// The first observation seeds the accumulator and is returned unchanged.
    pub fn smooth(&mut self, identity: &str, windows: &HashMap<String, u64>, values: Reading) -> Reading {
        values
            .into_iter()
            .map(|(key, value)| {
                let (Some(&window), TelemetryValue::Number(n)) = (windows.get(&key), value) else {
                    return (key, value);
                };
                if window < 2 {
                    return (key, value);
                }

                let slot = (identity.to_string(), key.clone());
                let smoothed = match self.values.get(&slot) {
                    Some(&prev) => {
                        let alpha = ema_alpha(window);
                        alpha * n + (1.0 - alpha) * prev
                    }
                    None => n,
                };
                self.values.insert(slot, smoothed);

                (key, TelemetryValue::Number(smoothed))
            })
            .collect()
    }

    pub fn get(&self, identity: &str, key: &str) -> Option<f64> {
        self.values
            .get(&(identity.to_string(), key.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
