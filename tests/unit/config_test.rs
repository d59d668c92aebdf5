//! Unit tests for service configuration.
//!
//! T072: Unit test for JSON config with sensor entries
//! T073: Unit test for config validation errors

use aquamon::config::{parse_config, ConfigFormat};
use aquamon::{ConfigError, SensorFactory};
use std::time::Duration;

const JSON_CONFIG: &str = r#"{
    "device_name": "greenhouse",
    "log_level": "aquamon=debug",
    "sensors": [
        {"type": "ds18b20", "id": "28-0001", "keys": {"temperature": "soil_temperature"},
         "smoothing": {"soil_temperature": 4}, "interval": 120}
    ]
}"#;

#[test]
fn test_json_config_feeds_factory() {
    let config = parse_config(JSON_CONFIG, ConfigFormat::Json).unwrap();
    assert_eq!(config.log_level, "aquamon=debug");
    assert_eq!(config.poll_interval(), Duration::from_secs(60));

    let bundles = SensorFactory::new().build_all(&config.sensors_value()).unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].interval(), Some(120));
    assert_eq!(bundles[0].smoothing()["soil_temperature"], 4);
}

#[test]
fn test_missing_device_name_is_parse_error() {
    let result = parse_config(r#"{"sensors": []}"#, ConfigFormat::Json);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_malformed_toml() {
    let result = parse_config("device_name = ", ConfigFormat::Toml);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_error_messages() {
    let err = parse_config(r#"{"device_name": ""}"#, ConfigFormat::Json).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid configuration: device_name must be a non-empty string"
    );
}
