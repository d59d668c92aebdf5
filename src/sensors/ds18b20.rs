//! DS18B20 1-Wire temperature sensor read through the Linux `w1_therm` sysfs interface.
//!
//! T040: Implement w1_slave parsing
//! T041: Implement device file resolution and discovery

use crate::sensors::driver::{
    Coercion, DriverDescriptor, DriverError, DriverParams, DriverType, Reading, RequiredFields,
    SensorDriver, TelemetryValue,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default sysfs directory for 1-Wire devices.
pub const DEFAULT_W1_DIR: &str = "/sys/bus/w1/devices";

/// Family code prefix of DS18B20 devices.
const FAMILY_PREFIX: &str = "28-";

/// DS18B20-related errors
#[derive(Debug, Error)]
pub enum Ds18b20Error {
    #[error("No DS18B20 sensor found under {0}")]
    NotFound(PathBuf),

    #[error("Failed to read device file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sensor CRC check failed")]
    CrcFailed,

    #[error("Temperature reading not found")]
    MissingTemperature,

    #[error("Malformed temperature value: {0}")]
    Malformed(String),
}

/// DS18B20 driver.
///
/// `path` may point straight at a `w1_slave` file or at a base directory. With an
/// id the device file is `<base>/<id>/w1_slave`; without one the first `28-*`
/// device under the base directory is used.
#[derive(Debug, Clone)]
pub struct Ds18b20Sensor {
    sensor_id: Option<String>,
    /// `path` as configured, reported for identity
    configured_path: Option<PathBuf>,
    base_dir: PathBuf,
    device_file: Option<PathBuf>,
}

impl Ds18b20Sensor {
    pub fn new(id: Option<&str>, path: Option<&str>) -> Self {
        let sensor_id = id.filter(|id| !id.is_empty()).map(str::to_string);
        let configured_path = path
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let mut base_dir = PathBuf::from(DEFAULT_W1_DIR);

        if let Some(path) = &configured_path {
            if path.is_file() {
                return Self {
                    sensor_id,
                    device_file: Some(path.clone()),
                    configured_path,
                    base_dir,
                };
            }
            base_dir = path.clone();
        }

        let device_file = sensor_id
            .as_ref()
            .map(|id| base_dir.join(id).join("w1_slave"));

        Self {
            sensor_id,
            configured_path,
            base_dir,
            device_file,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn device_file(&self) -> Option<&Path> {
        self.device_file.as_deref()
    }

    /// First `28-*/w1_slave` under the base directory, in name order.
    fn discover_device_file(&self) -> Result<PathBuf, Ds18b20Error> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&self.base_dir)
            .map_err(|_| Ds18b20Error::NotFound(self.base_dir.clone()))?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(FAMILY_PREFIX))
            .map(|entry| entry.path().join("w1_slave"))
            .filter(|file| file.is_file())
            .collect();

        candidates.sort();
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| Ds18b20Error::NotFound(self.base_dir.clone()))
    }

    fn resolve_device_file(&mut self) -> Result<PathBuf, Ds18b20Error> {
        if let Some(file) = &self.device_file {
            return Ok(file.clone());
        }

        let file = self.discover_device_file()?;
        tracing::info!("Discovered DS18B20 at {}", file.display());
        self.device_file = Some(file.clone());
        Ok(file)
    }

    /// Temperature in degrees Celsius.
    pub fn read_celsius(&mut self) -> Result<f64, Ds18b20Error> {
        let file = self.resolve_device_file()?;
        let contents = std::fs::read_to_string(file)?;
        parse_w1_slave(&contents)
    }
}

/// Parse the two-line `w1_slave` format.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(contents: &str) -> Result<f64, Ds18b20Error> {
    let mut lines = contents.lines();

    let crc_ok = lines
        .next()
        .map(|line| line.trim_end().ends_with("YES"))
        .unwrap_or(false);
    if !crc_ok {
        return Err(Ds18b20Error::CrcFailed);
    }

    let data = lines.next().ok_or(Ds18b20Error::MissingTemperature)?;
    let pos = data.find("t=").ok_or(Ds18b20Error::MissingTemperature)?;
    let raw = data[pos + 2..].trim();

    raw.parse::<f64>()
        .map(|milli| milli / 1000.0)
        .map_err(|_| Ds18b20Error::Malformed(raw.to_string()))
}

impl SensorDriver for Ds18b20Sensor {
    fn read(&mut self) -> Result<Reading, DriverError> {
        let celsius = self.read_celsius()?;

        let mut reading = Reading::new();
        reading.insert("temperature".to_string(), TelemetryValue::Number(celsius));
        Ok(reading)
    }

    fn kind(&self) -> &'static str {
        "Ds18b20Sensor"
    }

    fn id(&self) -> Option<&str> {
        self.sensor_id.as_deref()
    }

    /// The configured path, not the discovered device file, so the value never
    /// changes after a read.
    fn path(&self) -> Option<String> {
        self.configured_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    }
}

impl DriverType for Ds18b20Sensor {
    const DESCRIPTOR: DriverDescriptor = DriverDescriptor {
        name: "Ds18b20Sensor",
        accepted: &["id", "path"],
        required: RequiredFields::AnyOf(&[&["id"], &["path"]]),
        coercions: &[("id", Coercion::Text), ("path", Coercion::Text)],
    };

    fn from_params(params: &DriverParams) -> Result<Self, DriverError> {
        Ok(Self::new(params.str("id"), params.str("path")))
    }
}
