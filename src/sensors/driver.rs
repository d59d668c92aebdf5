//! Driver capability contract and declarative driver metadata.
//!
//! T010: Define SensorDriver trait and TelemetryValue
//! T011: Define DriverDescriptor (accepted params, required fields, coercions)
//! T012: Define DriverParams accessors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A single value reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// Boolean state (float switch, leak detector, ...)
    Bool(bool),
    /// Numeric measurement
    Number(f64),
}

impl TelemetryValue {
    /// Numeric view of the value. Booleans are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TelemetryValue::Number(value) => Some(*value),
            TelemetryValue::Bool(_) => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TelemetryValue::Bool(value) => Some(*value),
            TelemetryValue::Number(_) => None,
        }
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Number(value)
    }
}

impl From<bool> for TelemetryValue {
    fn from(value: bool) -> Self {
        TelemetryValue::Bool(value)
    }
}

impl std::fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryValue::Bool(value) => write!(f, "{}", value),
            TelemetryValue::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Raw output of one `read()` call, keyed by driver-internal names.
pub type Reading = BTreeMap<String, TelemetryValue>;

/// Opaque, driver-defined failure raised while constructing or reading a driver.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// The minimal contract every sensor implementation satisfies.
///
/// The identity hooks (`id`, `path`, `pin`) let the collector key its per-sensor
/// state without knowing the concrete driver.
pub trait SensorDriver: Send {
    /// Sample the hardware.
    fn read(&mut self) -> Result<Reading, DriverError>;

    /// Concrete driver type name, used in identities and logs.
    fn kind(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Explicit sensor id, if configured.
    fn id(&self) -> Option<&str> {
        None
    }

    /// Device path, if the driver is file backed.
    fn path(&self) -> Option<String> {
        None
    }

    /// GPIO pin, if the driver is pin backed.
    fn pin(&self) -> Option<u32> {
        None
    }
}

/// `i64::MIN` as f64 (exact).
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
/// `i64::MAX + 1` as f64 (exact); integral floats at or above it do not fit.
const I64_MAX_F64: f64 = 9_223_372_036_854_775_808.0;

/// Type conversion applied to a driver parameter before construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Whole number; accepts integers, integral floats and numeric strings
    Integer,
    /// Floating point; accepts numbers and numeric strings
    Float,
    /// Text; accepts strings, numbers and booleans
    Text,
}

impl Coercion {
    /// Name of the target type, for error messages.
    pub fn expected(&self) -> &'static str {
        match self {
            Coercion::Integer => "int",
            Coercion::Float => "float",
            Coercion::Text => "str",
        }
    }

    /// Convert a value, or `None` if it cannot be represented.
    pub fn apply(&self, value: &Value) -> Option<Value> {
        match self {
            Coercion::Integer => match value {
                Value::Number(n) => n.as_i64().map(Value::from).or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_F64).contains(f))
                        .map(|f| Value::from(f as i64))
                }),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            Coercion::Float => match value {
                Value::Number(n) => n.as_f64().and_then(Number::from_f64).map(Value::Number),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
                _ => None,
            },
            Coercion::Text => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
        }
    }
}

/// Which constructor parameters must be present and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredFields {
    /// No requirement
    None,
    /// Every listed field
    AllOf(&'static [&'static str]),
    /// At least one group with every field of that group
    AnyOf(&'static [&'static [&'static str]]),
}

impl RequiredFields {
    /// Every field named anywhere in the requirement.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            RequiredFields::None => Vec::new(),
            RequiredFields::AllOf(fields) => fields.to_vec(),
            RequiredFields::AnyOf(groups) => groups.iter().flat_map(|g| g.iter().copied()).collect(),
        }
    }

    /// Check the requirement against filtered parameters.
    pub fn is_satisfied(&self, params: &DriverParams) -> bool {
        match self {
            RequiredFields::None => true,
            RequiredFields::AllOf(fields) => fields.iter().all(|f| params.is_present(f)),
            RequiredFields::AnyOf(groups) => groups
                .iter()
                .any(|group| group.iter().all(|f| params.is_present(f))),
        }
    }
}

impl std::fmt::Display for RequiredFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredFields::None => write!(f, "nothing"),
            RequiredFields::AllOf(fields) => write!(f, "all of [{}]", fields.join(", ")),
            RequiredFields::AnyOf(groups) => {
                let groups: Vec<String> = groups
                    .iter()
                    .map(|g| format!("{{{}}}", g.join(", ")))
                    .collect();
                write!(f, "at least one of [{}]", groups.join(", "))
            }
        }
    }
}

/// Static metadata attached to each driver type and queried by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverDescriptor {
    /// Driver type name for messages
    pub name: &'static str,
    /// Configuration fields passed through to the constructor
    pub accepted: &'static [&'static str],
    /// Required-field contract
    pub required: RequiredFields,
    /// Per-field coercions
    pub coercions: &'static [(&'static str, Coercion)],
}

impl DriverDescriptor {
    /// Whether a configuration field is passed to the constructor.
    pub fn accepts(&self, field: &str) -> bool {
        self.accepted.iter().any(|accepted| *accepted == field)
    }

    /// A required field the driver does not accept. Such a driver can never be built.
    pub fn undeclared_required_field(&self) -> Option<&'static str> {
        self.required.fields().into_iter().find(|f| !self.accepts(f))
    }
}

/// A driver type the factory can construct.
pub trait DriverType: SensorDriver + Sized + 'static {
    /// Metadata used for filtering, coercion and required-field checks.
    const DESCRIPTOR: DriverDescriptor;

    /// Construct from filtered, coerced parameters.
    fn from_params(params: &DriverParams) -> Result<Self, DriverError>;
}

/// Whether a value counts as missing for required-field checks.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Constructor parameters after filtering to a driver's accepted set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverParams {
    fields: Map<String, Value>,
}

impl DriverParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Present and non-empty.
    pub fn is_present(&self, field: &str) -> bool {
        self.get(field).is_some_and(|v| !is_empty_value(v))
    }

    /// Non-empty string parameter.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }
}

impl FromIterator<(String, Value)> for DriverParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
