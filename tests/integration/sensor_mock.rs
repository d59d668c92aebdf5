//! Mock sensor driver for integration tests.
//!
//! T090: Mock driver registered through the factory like a real one

use aquamon::sensors::driver::{
    Coercion, DriverDescriptor, DriverError, DriverParams, DriverType, Reading, RequiredFields,
    SensorDriver, TelemetryValue,
};
use aquamon::SensorFactory;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Read attempts per probe id, shared across the test binary.
fn read_counts() -> &'static Mutex<HashMap<String, u32>> {
    static COUNTS: OnceLock<Mutex<HashMap<String, u32>>> = OnceLock::new();
    COUNTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Number of `read()` calls made on the probe with this id. Use ids unique to one test.
pub fn reads(id: &str) -> u32 {
    read_counts().lock().unwrap().get(id).copied().unwrap_or(0)
}

/// Probe that reports `value`, then `value + step`, `value + 2 * step`, ...
///
/// With `fail = true` every read returns an error.
pub struct MockProbe {
    /// Sensor id
    pub id: String,
    /// Next reported value
    pub value: f64,
    /// Increment applied after each read
    pub step: f64,
    /// Fail every read
    pub fail: bool,
}

impl SensorDriver for MockProbe {
    fn read(&mut self) -> Result<Reading, DriverError> {
        *read_counts().lock().unwrap().entry(self.id.clone()).or_insert(0) += 1;

        if self.fail {
            return Err(format!("probe {} not responding", self.id).into());
        }

        let mut reading = Reading::new();
        reading.insert("reading".to_string(), TelemetryValue::Number(self.value));
        reading.insert("leak".to_string(), TelemetryValue::Bool(false));
        self.value += self.step;
        Ok(reading)
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl DriverType for MockProbe {
    const DESCRIPTOR: DriverDescriptor = DriverDescriptor {
        name: "MockProbe",
        accepted: &["id", "value", "step", "fail"],
        required: RequiredFields::AllOf(&["id"]),
        coercions: &[
            ("id", Coercion::Text),
            ("value", Coercion::Float),
            ("step", Coercion::Float),
        ],
    };

    fn from_params(params: &DriverParams) -> Result<Self, DriverError> {
        Ok(Self {
            id: params.str("id").ok_or("id missing")?.to_string(),
            value: params.f64("value").unwrap_or(0.0),
            step: params.f64("step").unwrap_or(0.0),
            fail: params.bool("fail").unwrap_or(false),
        })
    }
}

/// Factory with the built-in drivers plus `mock`.
pub fn mock_factory() -> SensorFactory {
    let mut factory = SensorFactory::new();
    factory
        .register_driver::<MockProbe>("mock")
        .expect("mock registration");
    factory
}
