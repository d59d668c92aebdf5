//! Unit tests for EMA smoothing.
//!
//! T053: Unit test for EMA seed and alpha

use aquamon::sensors::driver::{Reading, TelemetryValue};
use aquamon::telemetry::pipeline::{ema_alpha, EmaStore};
use std::collections::HashMap;

fn single(key: &str, value: f64) -> Reading {
    let mut reading = Reading::new();
    reading.insert(key.to_string(), TelemetryValue::Number(value));
    reading
}

#[test]
fn test_alpha_from_window() {
    assert_eq!(ema_alpha(3), 0.5);
    assert_eq!(ema_alpha(4), 0.4);
    assert!((ema_alpha(10) - 2.0 / 11.0).abs() < f64::EPSILON);
}

#[test]
fn test_window_three_sequence() {
    let mut store = EmaStore::new();
    let windows: HashMap<String, u64> = [("k".to_string(), 3)].into_iter().collect();

    let first = store.smooth("probe", &windows, single("k", 10.0));
    let second = store.smooth("probe", &windows, single("k", 20.0));
    let third = store.smooth("probe", &windows, single("k", 30.0));

    assert_eq!(first["k"].as_number(), Some(10.0));
    assert_eq!(second["k"].as_number(), Some(15.0));
    assert_eq!(third["k"].as_number(), Some(22.5));
}

#[test]
fn test_unsmoothed_keys_untouched() {
    let mut store = EmaStore::new();
    let windows: HashMap<String, u64> = [("k".to_string(), 5)].into_iter().collect();

    let out = store.smooth("probe", &windows, single("other", 99.0));
    assert_eq!(out["other"].as_number(), Some(99.0));
    assert!(store.is_empty());
}

#[test]
fn test_window_one_is_accepted_but_inert() {
    let mut store = EmaStore::new();
    let windows: HashMap<String, u64> = [("k".to_string(), 1)].into_iter().collect();

    for value in [1.0, 50.0, 3.0] {
        let out = store.smooth("probe", &windows, single("k", value));
        assert_eq!(out["k"].as_number(), Some(value));
    }
}
