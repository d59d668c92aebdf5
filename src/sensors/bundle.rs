//! Sensor bundle: a constructed driver plus its canonical-key metadata.
//!
//! T020: Define SensorBundle, Calibration and ValueRange

use crate::sensors::driver::SensorDriver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of process-local fallback identity tokens.
static NEXT_FALLBACK_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Linear correction applied to a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub offset: f64,
    pub slope: f64,
}

impl Calibration {
    pub fn new(offset: f64, slope: f64) -> Self {
        Self { offset, slope }
    }

    /// `value * slope + offset`
    pub fn apply(&self, value: f64) -> f64 {
        value * self.slope + self.offset
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: 0.0,
            slope: 1.0,
        }
    }
}

/// Inclusive plausibility bounds for a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// A driver and the metadata the collector needs to turn its output into telemetry.
///
/// Bundles are normally produced by [`SensorFactory`](crate::sensors::factory::SensorFactory),
/// which validates every field. The `with_*` builders do not validate and exist for
/// wiring drivers by hand.
pub struct SensorBundle {
    /// The constructed driver
    driver: Box<dyn SensorDriver>,
    /// Raw driver key -> canonical key
    keys: BTreeMap<String, String>,
    /// Calibration per canonical key
    calibration: HashMap<String, Calibration>,
    /// Plausibility range per canonical key
    ranges: HashMap<String, ValueRange>,
    /// EMA window per canonical key
    smoothing: HashMap<String, u64>,
    /// Minimum seconds between reads
    interval: Option<u64>,
    /// Fixed at construction so collector state keys never move
    identity: String,
}

impl SensorBundle {
    /// Wrap a driver with empty metadata.
    pub fn new(driver: Box<dyn SensorDriver>) -> Self {
        let identity = identity_of(driver.as_ref());
        Self {
            identity,
            driver,
            keys: BTreeMap::new(),
            calibration: HashMap::new(),
            ranges: HashMap::new(),
            smoothing: HashMap::new(),
            interval: None,
        }
    }

    pub(crate) fn from_parts(
        driver: Box<dyn SensorDriver>,
        keys: BTreeMap<String, String>,
        calibration: HashMap<String, Calibration>,
        ranges: HashMap<String, ValueRange>,
        smoothing: HashMap<String, u64>,
        interval: Option<u64>,
    ) -> Self {
        Self {
            keys,
            calibration,
            ranges,
            smoothing,
            interval,
            ..Self::new(driver)
        }
    }

    /// Map a raw driver key to a canonical key.
    pub fn with_key(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.keys.insert(raw.into(), canonical.into());
        self
    }

    pub fn with_calibration(mut self, canonical: impl Into<String>, calibration: Calibration) -> Self {
        self.calibration.insert(canonical.into(), calibration);
        self
    }

    pub fn with_range(mut self, canonical: impl Into<String>, range: ValueRange) -> Self {
        self.ranges.insert(canonical.into(), range);
        self
    }

    pub fn with_smoothing(mut self, canonical: impl Into<String>, window: u64) -> Self {
        self.smoothing.insert(canonical.into(), window);
        self
    }

    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.interval = Some(seconds);
        self
    }

    pub fn driver(&self) -> &dyn SensorDriver {
        self.driver.as_ref()
    }

    pub(crate) fn driver_mut(&mut self) -> &mut dyn SensorDriver {
        self.driver.as_mut()
    }

    pub fn keys(&self) -> &BTreeMap<String, String> {
        &self.keys
    }

    pub fn calibration(&self) -> &HashMap<String, Calibration> {
        &self.calibration
    }

    pub fn ranges(&self) -> &HashMap<String, ValueRange> {
        &self.ranges
    }

    pub fn smoothing(&self) -> &HashMap<String, u64> {
        &self.smoothing
    }

    pub fn interval(&self) -> Option<u64> {
        self.interval
    }

    /// Stable key for per-sensor collector state: `<DriverType>:<id|path|pin|token>`.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Derive the identity from the driver as constructed. Drivers without an id,
/// path or pin get a process-local token.
fn identity_of(driver: &dyn SensorDriver) -> String {
    let attribute = driver
        .id()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| driver.path().filter(|path| !path.is_empty()))
        .or_else(|| driver.pin().map(|pin| pin.to_string()))
        .unwrap_or_else(|| format!("{:#x}", NEXT_FALLBACK_TOKEN.fetch_add(1, Ordering::Relaxed)));

    format!("{}:{}", driver.kind(), attribute)
}

impl std::fmt::Debug for SensorBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorBundle")
            .field("identity", &self.identity)
            .field("driver", &self.driver.kind())
            .field("keys", &self.keys)
            .field("calibration", &self.calibration)
            .field("ranges", &self.ranges)
            .field("smoothing", &self.smoothing)
            .field("interval", &self.interval)
            .finish()
    }
}
