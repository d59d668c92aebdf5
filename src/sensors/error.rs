//! Factory error types.
//!
//! T013: Create FactoryError types with thiserror

use crate::sensors::driver::DriverError;
use thiserror::Error;

/// Configuration-time failures raised while registering or building sensors.
///
/// Runtime read failures are not part of this taxonomy; they stay opaque
/// [`DriverError`]s and are handled by the collector.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// No driver is registered for the requested type.
    #[error(
        "Unknown sensor type '{sensor_type}'. Known types: {}{}",
        known_list(.known_types),
        context_suffix(Some(.sensor_type.as_str()), .sensor_id.as_deref())
    )]
    UnknownSensorType {
        sensor_type: String,
        known_types: Vec<String>,
        sensor_id: Option<String>,
    },

    /// Structural or semantic validation failure, or driver construction failure.
    #[error("{message}{}", context_suffix(.sensor_type.as_deref(), .sensor_id.as_deref()))]
    InvalidSensorConfig {
        message: String,
        sensor_type: Option<String>,
        sensor_id: Option<String>,
        #[source]
        cause: Option<DriverError>,
    },
}

impl FactoryError {
    /// Validation failure without context.
    pub fn invalid(message: impl Into<String>) -> Self {
        FactoryError::InvalidSensorConfig {
            message: message.into(),
            sensor_type: None,
            sensor_id: None,
            cause: None,
        }
    }

    /// Driver constructor failure, keeping the original error as the source.
    pub fn construction(
        message: impl Into<String>,
        sensor_type: &str,
        sensor_id: Option<&str>,
        cause: DriverError,
    ) -> Self {
        FactoryError::InvalidSensorConfig {
            message: message.into(),
            sensor_type: Some(sensor_type.to_string()),
            sensor_id: sensor_id.map(str::to_string),
            cause: Some(cause),
        }
    }

    /// Fill in sensor type and id where not already set.
    pub fn with_context(mut self, sensor_type: Option<&str>, sensor_id: Option<&str>) -> Self {
        match &mut self {
            FactoryError::UnknownSensorType {
                sensor_id: id_slot, ..
            } => {
                if id_slot.is_none() {
                    *id_slot = sensor_id.map(str::to_string);
                }
            }
            FactoryError::InvalidSensorConfig {
                sensor_type: type_slot,
                sensor_id: id_slot,
                ..
            } => {
                if type_slot.is_none() {
                    *type_slot = sensor_type.map(str::to_string);
                }
                if id_slot.is_none() {
                    *id_slot = sensor_id.map(str::to_string);
                }
            }
        }
        self
    }

    pub fn sensor_type(&self) -> Option<&str> {
        match self {
            FactoryError::UnknownSensorType { sensor_type, .. } => Some(sensor_type),
            FactoryError::InvalidSensorConfig { sensor_type, .. } => sensor_type.as_deref(),
        }
    }

    pub fn sensor_id(&self) -> Option<&str> {
        match self {
            FactoryError::UnknownSensorType { sensor_id, .. }
            | FactoryError::InvalidSensorConfig { sensor_id, .. } => sensor_id.as_deref(),
        }
    }

    /// Registered types at the time of an unknown-type failure.
    pub fn known_types(&self) -> Option<&[String]> {
        match self {
            FactoryError::UnknownSensorType { known_types, .. } => Some(known_types),
            FactoryError::InvalidSensorConfig { .. } => None,
        }
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, FactoryError::UnknownSensorType { .. })
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self, FactoryError::InvalidSensorConfig { .. })
    }
}

fn known_list(known_types: &[String]) -> String {
    if known_types.is_empty() {
        "(none)".to_string()
    } else {
        known_types.join(", ")
    }
}

fn context_suffix(sensor_type: Option<&str>, sensor_id: Option<&str>) -> String {
    let mut context = Vec::new();
    if let Some(sensor_type) = sensor_type.filter(|t| !t.is_empty()) {
        context.push(format!("sensor_type={}", sensor_type));
    }
    if let Some(sensor_id) = sensor_id.filter(|id| !id.is_empty()) {
        context.push(format!("sensor_id={}", sensor_id));
    }

    if context.is_empty() {
        String::new()
    } else {
        format!(" ({})", context.join(", "))
    }
}

/// Result type for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;
