//! Sensor registry and factory.
//!
//! T030: Implement SensorFactory registry with built-in drivers
//! T031: Implement build() with metadata validation
//! T032: Implement driver parameter filtering, coercion and required-field checks
//! T033: Implement build_all() with per-entry failure isolation

use crate::sensors::bundle::{Calibration, SensorBundle, ValueRange};
use crate::sensors::driver::{
    is_empty_value, DriverDescriptor, DriverError, DriverParams, DriverType, SensorDriver,
};
use crate::sensors::ds18b20::Ds18b20Sensor;
use crate::sensors::error::{FactoryError, FactoryResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};

type Constructor = fn(&DriverParams) -> Result<Box<dyn SensorDriver>, DriverError>;

/// A registry entry: driver metadata plus its constructor.
#[derive(Clone, Copy)]
pub struct DriverRegistration {
    descriptor: DriverDescriptor,
    construct: Constructor,
}

impl DriverRegistration {
    /// Registration for a driver type.
    pub fn of<T: DriverType>() -> Self {
        Self {
            descriptor: T::DESCRIPTOR,
            construct: construct_boxed::<T>,
        }
    }
}

impl std::fmt::Debug for DriverRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistration")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

fn construct_boxed<T: DriverType>(params: &DriverParams) -> Result<Box<dyn SensorDriver>, DriverError> {
    Ok(Box::new(T::from_params(params)?))
}

/// Builds validated [`SensorBundle`]s from untyped configuration entries.
///
/// Registration takes `&mut self` and building takes `&self`, so all
/// registrations happen before the factory is shared for building.
#[derive(Debug, Clone)]
pub struct SensorFactory {
    /// Normalized type name -> driver
    registry: BTreeMap<String, DriverRegistration>,
}

impl SensorFactory {
    /// Factory with the built-in drivers registered.
    pub fn new() -> Self {
        let mut registry = BTreeMap::new();
        registry.insert("ds18b20".to_string(), DriverRegistration::of::<Ds18b20Sensor>());
        Self { registry }
    }

    /// Add or replace the driver for a type name.
    pub fn register(&mut self, sensor_type: &str, registration: DriverRegistration) -> FactoryResult<()> {
        let sensor_type = sensor_type.trim().to_lowercase();
        if sensor_type.is_empty() {
            return Err(FactoryError::invalid("sensor_type cannot be empty or whitespace"));
        }

        if let Some(old) = self.registry.insert(sensor_type.clone(), registration) {
            tracing::warn!(
                "Overriding driver for '{}': {} -> {}",
                sensor_type,
                old.descriptor.name,
                registration.descriptor.name
            );
        } else {
            tracing::debug!("Registered driver {} as '{}'", registration.descriptor.name, sensor_type);
        }

        Ok(())
    }

    /// Register a driver type under a type name.
    pub fn register_driver<T: DriverType>(&mut self, sensor_type: &str) -> FactoryResult<()> {
        self.register(sensor_type, DriverRegistration::of::<T>())
    }

    /// Registered type names, sorted.
    pub fn known_types(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    pub fn is_registered(&self, sensor_type: &str) -> bool {
        self.registry.contains_key(&sensor_type.trim().to_lowercase())
    }

    /// Validate one configuration entry and construct its bundle.
    pub fn build(&self, entry: &Value) -> FactoryResult<SensorBundle> {
        let entry = entry
            .as_object()
            .ok_or_else(|| FactoryError::invalid("Sensor configuration must be a mapping"))?;

        let sensor_id = entry.get("id").and_then(value_label);

        let sensor_type = match entry.get("type").and_then(Value::as_str).map(str::trim) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => {
                return Err(FactoryError::invalid("Missing or invalid 'type' in sensor configuration")
                    .with_context(None, sensor_id.as_deref()))
            }
        };

        self.build_entry(entry, &sensor_type, sensor_id.as_deref())
            .map_err(|e| e.with_context(Some(sensor_type.as_str()), sensor_id.as_deref()))
    }

    fn build_entry(
        &self,
        entry: &Map<String, Value>,
        sensor_type: &str,
        sensor_id: Option<&str>,
    ) -> FactoryResult<SensorBundle> {
        let keys = parse_keys(entry.get("keys"))?;
        let canonical: BTreeSet<&str> = keys.values().map(String::as_str).collect();

        let calibration = parse_calibration(entry.get("calibration"), &canonical)?;
        let ranges = parse_ranges(entry.get("ranges"), &canonical)?;
        let smoothing = parse_smoothing(entry.get("smoothing"), &canonical)?;
        let interval = parse_interval(entry.get("interval"))?;

        let registration = self
            .registry
            .get(sensor_type)
            .ok_or_else(|| FactoryError::UnknownSensorType {
                sensor_type: sensor_type.to_string(),
                known_types: self.known_types(),
                sensor_id: sensor_id.map(str::to_string),
            })?;

        let descriptor = registration.descriptor;
        let params = driver_params(&descriptor, entry)?;

        let driver = (registration.construct)(&params).map_err(|cause| {
            FactoryError::construction(
                format!("Failed to instantiate {}: {}", descriptor.name, cause),
                sensor_type,
                sensor_id,
                cause,
            )
        })?;

        tracing::debug!(
            "Built {} sensor {} ({} keys, interval {:?})",
            sensor_type,
            driver.kind(),
            keys.len(),
            interval
        );

        Ok(SensorBundle::from_parts(
            driver,
            keys,
            calibration,
            ranges,
            smoothing,
            interval,
        ))
    }

    /// Build every entry of a sensor list, skipping entries that fail.
    ///
    /// `config` is either a list of entries or a mapping with a `sensors` list.
    /// Only a malformed top-level shape is returned as an error.
    pub fn build_all(&self, config: &Value) -> FactoryResult<Vec<SensorBundle>> {
        let entries = match config {
            Value::Array(entries) => entries,
            Value::Object(map) if map.contains_key("sensors") => match map.get("sensors") {
                Some(Value::Array(entries)) => entries,
                _ => return Err(FactoryError::invalid("'sensors' must be a list")),
            },
            _ => {
                return Err(FactoryError::invalid(
                    "build_all expects a list of sensor configs or a mapping containing a 'sensors' list",
                ))
            }
        };

        let mut bundles = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.build(entry))) {
                Ok(Ok(bundle)) => bundles.push(bundle),
                Ok(Err(e)) => {
                    let sensor_type = e
                        .sensor_type()
                        .map(str::to_string)
                        .or_else(|| entry_label(entry, "type"));
                    let sensor_id = e.sensor_id().map(str::to_string).or_else(|| entry_label(entry, "id"));
                    tracing::warn!(
                        "Skipping sensor (index={}, type={}, id={}): {}",
                        index,
                        sensor_type.as_deref().unwrap_or("-"),
                        sensor_id.as_deref().unwrap_or("-"),
                        e
                    );
                }
                Err(payload) => {
                    tracing::error!(
                        "Unexpected error building sensor (index={}, type={}, id={}): {} [entry: {}]",
                        index,
                        entry_label(entry, "type").as_deref().unwrap_or("-"),
                        entry_label(entry, "id").as_deref().unwrap_or("-"),
                        panic_message(&*payload),
                        entry
                    );
                }
            }
        }

        if bundles.is_empty() {
            tracing::warn!("No sensors were built from {} configured entries", entries.len());
        } else {
            tracing::info!("Built {} of {} configured sensors", bundles.len(), entries.len());
        }

        Ok(bundles)
    }
}

impl Default for SensorFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Steps 9-11: filter to accepted fields, coerce, then check the required-field contract.
fn driver_params(descriptor: &DriverDescriptor, entry: &Map<String, Value>) -> FactoryResult<DriverParams> {
    if let Some(field) = descriptor.undeclared_required_field() {
        return Err(FactoryError::invalid(format!(
            "{} requires field '{}' that it does not accept",
            descriptor.name, field
        )));
    }

    let mut params: DriverParams = entry
        .iter()
        .filter(|(field, _)| descriptor.accepts(field))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    for (field, coercion) in descriptor.coercions {
        let Some(value) = params.get(field) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }

        let coerced = coercion.apply(value).ok_or_else(|| {
            FactoryError::invalid(format!(
                "Invalid type for '{}' in {}: expected {}",
                field,
                descriptor.name,
                coercion.expected()
            ))
        })?;
        params.insert(*field, coerced);
    }

    if !descriptor.required.is_satisfied(&params) {
        return Err(FactoryError::invalid(format!(
            "{} requires {}",
            descriptor.name, descriptor.required
        )));
    }

    Ok(params)
}

/// Optional metadata section; absent and `null` both mean empty.
fn section<'a>(value: Option<&'a Value>, name: &str) -> FactoryResult<Option<&'a Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(FactoryError::invalid(format!("'{}' must be a mapping", name))),
    }
}

fn check_canonical(key: &str, section: &str, canonical: &BTreeSet<&str>) -> FactoryResult<()> {
    if key.trim().is_empty() {
        return Err(FactoryError::invalid(format!(
            "'{}' in {} must be a non-empty string",
            key, section
        )));
    }
    if !canonical.contains(key) {
        return Err(FactoryError::invalid(format!(
            "metadata references unknown canonical key '{}' in {}",
            key, section
        )));
    }
    Ok(())
}

fn parse_keys(value: Option<&Value>) -> FactoryResult<BTreeMap<String, String>> {
    let map = match value {
        Some(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(FactoryError::invalid("Missing or invalid 'keys' in sensor configuration")),
    };

    map.iter()
        .map(|(raw, canonical)| match canonical.as_str() {
            Some(canonical) if !canonical.trim().is_empty() => Ok((raw.clone(), canonical.to_string())),
            _ => Err(FactoryError::invalid(format!(
                "Canonical key for '{}' in keys must be a non-empty string",
                raw
            ))),
        })
        .collect()
}

fn parse_calibration(
    value: Option<&Value>,
    canonical: &BTreeSet<&str>,
) -> FactoryResult<HashMap<String, Calibration>> {
    let mut calibration = HashMap::new();
    let Some(map) = section(value, "calibration")? else {
        return Ok(calibration);
    };

    for (key, entry) in map {
        check_canonical(key, "calibration", canonical)?;

        let entry = entry.as_object().ok_or_else(|| {
            FactoryError::invalid(format!(
                "Calibration for '{}' must be a mapping with 'offset' and 'slope'",
                key
            ))
        })?;
        let (Some(offset), Some(slope)) = (entry.get("offset"), entry.get("slope")) else {
            return Err(FactoryError::invalid(format!(
                "Calibration for '{}' must include 'offset' and 'slope'",
                key
            )));
        };
        let (Some(offset), Some(slope)) = (number(offset), number(slope)) else {
            return Err(FactoryError::invalid(format!(
                "Calibration values for '{}' must be numeric",
                key
            )));
        };

        calibration.insert(key.clone(), Calibration::new(offset, slope));
    }

    Ok(calibration)
}

fn parse_ranges(value: Option<&Value>, canonical: &BTreeSet<&str>) -> FactoryResult<HashMap<String, ValueRange>> {
    let mut ranges = HashMap::new();
    let Some(map) = section(value, "ranges")? else {
        return Ok(ranges);
    };

    for (key, entry) in map {
        check_canonical(key, "ranges", canonical)?;

        let entry = entry.as_object().ok_or_else(|| {
            FactoryError::invalid(format!("Range for '{}' must be a mapping with 'min' and 'max'", key))
        })?;
        let (Some(min), Some(max)) = (entry.get("min"), entry.get("max")) else {
            return Err(FactoryError::invalid(format!(
                "Range for '{}' must include 'min' and 'max'",
                key
            )));
        };
        let (Some(min), Some(max)) = (number(min), number(max)) else {
            return Err(FactoryError::invalid(format!("Range values for '{}' must be numeric", key)));
        };
        if min >= max {
            return Err(FactoryError::invalid(format!(
                "Invalid range for '{}': min ({}) must be less than max ({})",
                key, min, max
            )));
        }

        ranges.insert(key.clone(), ValueRange::new(min, max));
    }

    Ok(ranges)
}

fn parse_smoothing(value: Option<&Value>, canonical: &BTreeSet<&str>) -> FactoryResult<HashMap<String, u64>> {
    let mut smoothing = HashMap::new();
    let Some(map) = section(value, "smoothing")? else {
        return Ok(smoothing);
    };

    for (key, window) in map {
        check_canonical(key, "smoothing", canonical)?;

        let window = window.as_i64().ok_or_else(|| {
            FactoryError::invalid(format!("Smoothing for '{}' must be an integer: {}", key, window))
        })?;
        if window < 1 {
            return Err(FactoryError::invalid(format!(
                "Smoothing for '{}' must be greater than or equal to 1: {}",
                key, window
            )));
        }

        smoothing.insert(key.clone(), window as u64);
    }

    Ok(smoothing)
}

fn parse_interval(value: Option<&Value>) -> FactoryResult<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_i64() {
            Some(interval) if interval >= 1 => Ok(Some(interval as u64)),
            _ => Err(FactoryError::invalid(
                "'interval' must be an integer >= 1 if provided",
            )),
        },
    }
}

/// Numbers only; booleans are rejected.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Printable form of an id-like value.
fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn entry_label(entry: &Value, field: &str) -> Option<String> {
    entry.get(field).and_then(value_label)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
