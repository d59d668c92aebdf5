//! Unit tests for sensor factory validation.
//!
//! T034: Unit test for canonical-key validation
//! T035: Unit test for unknown sensor types and build_all isolation

use aquamon::sensors::driver::{
    DriverDescriptor, DriverError, DriverParams, DriverType, Reading, RequiredFields, SensorDriver,
};
use aquamon::{FactoryError, SensorFactory};
use serde_json::json;

struct Float;

impl SensorDriver for Float {
    fn read(&mut self) -> Result<Reading, DriverError> {
        Ok(Reading::new())
    }

    fn pin(&self) -> Option<u32> {
        Some(4)
    }
}

impl DriverType for Float {
    const DESCRIPTOR: DriverDescriptor = DriverDescriptor {
        name: "Float",
        accepted: &[],
        required: RequiredFields::None,
        coercions: &[],
    };

    fn from_params(_params: &DriverParams) -> Result<Self, DriverError> {
        Ok(Float)
    }
}

fn factory() -> SensorFactory {
    let mut factory = SensorFactory::new();
    factory.register_driver::<Float>("float_switch").unwrap();
    factory
}

#[test]
fn test_metadata_keys_must_be_canonical() {
    let entries = [
        json!({"type": "float_switch", "keys": {"state": "high_water"},
               "calibration": {"state": {"offset": 0, "slope": 1}}}),
        json!({"type": "float_switch", "keys": {"state": "high_water"},
               "ranges": {"low_water": {"min": 0, "max": 1}}}),
        json!({"type": "float_switch", "keys": {"state": "high_water"},
               "smoothing": {"water": 2}}),
    ];

    for entry in entries {
        match factory().build(&entry) {
            Err(FactoryError::InvalidSensorConfig { message, .. }) => {
                assert!(message.contains("unknown canonical key"), "{}", message)
            }
            other => panic!("expected InvalidSensorConfig, got {:?}", other.map(|b| b.identity().to_string())),
        }
    }
}

#[test]
fn test_unknown_type_lists_every_registered_type() {
    let err = factory()
        .build(&json!({"type": "Turbidity", "id": 7, "keys": {"ntu": "turbidity"}}))
        .unwrap_err();

    match &err {
        FactoryError::UnknownSensorType {
            sensor_type,
            known_types,
            sensor_id,
        } => {
            assert_eq!(sensor_type, "turbidity");
            assert_eq!(known_types, &vec!["ds18b20".to_string(), "float_switch".to_string()]);
            assert_eq!(sensor_id.as_deref(), Some("7"));
        }
        other => panic!("expected UnknownSensorType, got {}", other),
    }

    assert_eq!(
        err.to_string(),
        "Unknown sensor type 'turbidity'. Known types: ds18b20, float_switch \
         (sensor_type=turbidity, sensor_id=7)"
    );
}

#[test]
fn test_metadata_is_checked_before_type_lookup() {
    let err = factory()
        .build(&json!({"type": "nonexistent", "keys": {"a": "b"}, "interval": -1}))
        .unwrap_err();
    assert!(err.is_invalid_config());
}

#[test]
fn test_undeclared_keys_are_filtered() {
    let bundle = factory()
        .build(&json!({"type": "float_switch", "pin": "not-a-pin", "label": "sump",
                       "keys": {"state": "high_water"}}))
        .unwrap();
    assert_eq!(bundle.identity(), "Float:4");
}

#[test]
fn test_build_all_skips_unknown_type() {
    let config = json!({
        "sensors": [
            {"type": "float_switch", "keys": {"state": "high_water"}},
            {"type": "conductivity", "id": "ec", "keys": {"ec": "salinity"}},
            {"type": "float_switch", "keys": {"state": "low_water"}},
        ]
    });

    let bundles = factory().build_all(&config).unwrap();
    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[1].keys()["state"], "low_water");
}

#[test]
fn test_build_all_skips_non_mapping_entries() {
    let config = json!([
        42,
        null,
        {"type": "float_switch", "keys": {"state": "high_water"}},
    ]);
    assert_eq!(factory().build_all(&config).unwrap().len(), 1);
}
