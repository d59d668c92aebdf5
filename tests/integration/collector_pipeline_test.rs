//! Integration tests for the collection pipeline on factory-built bundles.
//!
//! T091: Interval gating, EMA, calibration before ranging
//! T092: Failure isolation and last-write-wins

use crate::sensor_mock::{mock_factory, reads};
use aquamon::telemetry::clock::ManualClock;
use aquamon::{TelemetryCollector, TelemetryMap};
use serde_json::{json, Value};

fn collector(entries: Value, clock: &ManualClock) -> TelemetryCollector<ManualClock> {
    let bundles = mock_factory().build_all(&entries).unwrap();
    TelemetryCollector::with_clock(bundles, clock.clone())
}

fn number(telemetry: &TelemetryMap, key: &str) -> Option<f64> {
    telemetry.get(key).and_then(|v| v.as_number())
}

#[test]
fn test_interval_gating() {
    let clock = ManualClock::new(1_700_000_000.0);
    let mut collector = collector(
        json!([{"type": "mock", "id": "a", "value": 7, "interval": 5, "keys": {"reading": "ph"}}]),
        &clock,
    );

    assert_eq!(number(&collector.collect(), "ph"), Some(7.0));

    clock.advance(1.0);
    assert!(collector.collect().get("ph").is_none());

    clock.advance(4.0);
    assert_eq!(number(&collector.collect(), "ph"), Some(7.0));
}

#[test]
fn test_ema_window_three() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([{
            "type": "mock", "id": "k", "value": 10, "step": 10,
            "keys": {"reading": "k"},
            "smoothing": {"k": 3}
        }]),
        &clock,
    );

    let outputs: Vec<f64> = (0..3)
        .map(|_| number(&collector.collect(), "k").unwrap())
        .collect();

    assert_eq!(outputs, vec![10.0, 15.0, 22.5]);
}

#[test]
fn test_calibration_precedes_ranging() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([
            {
                "type": "mock", "id": "calibrated", "value": 40,
                "keys": {"reading": "temp"},
                "calibration": {"temp": {"offset": -50, "slope": 1}},
                "ranges": {"temp": {"min": -20, "max": -5}}
            },
            {
                "type": "mock", "id": "raw", "value": 40,
                "keys": {"reading": "raw_temp"},
                "ranges": {"raw_temp": {"min": -20, "max": -5}}
            }
        ]),
        &clock,
    );

    let telemetry = collector.collect();
    assert_eq!(number(&telemetry, "temp"), Some(-10.0));
    assert!(!telemetry.contains_key("raw_temp"));
}

#[test]
fn test_partial_failure_isolation() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([
            {"type": "mock", "id": "one", "value": 1, "keys": {"reading": "first"}},
            {"type": "mock", "id": "two", "value": 2, "fail": true, "keys": {"reading": "second"}},
            {"type": "mock", "id": "three", "value": 3, "keys": {"reading": "third"}}
        ]),
        &clock,
    );

    let telemetry = collector.collect();
    assert_eq!(number(&telemetry, "first"), Some(1.0));
    assert_eq!(number(&telemetry, "third"), Some(3.0));
    assert!(!telemetry.contains_key("second"));
}

#[test]
fn test_last_write_wins() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([
            {"type": "mock", "id": "early", "value": 1, "keys": {"reading": "x"}},
            {"type": "mock", "id": "late", "value": 2, "keys": {"reading": "x"}}
        ]),
        &clock,
    );

    assert_eq!(number(&collector.collect(), "x"), Some(2.0));
}

#[test]
fn test_failing_bundle_retried_every_cycle() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([
            {"type": "mock", "id": "retry-dead", "fail": true, "interval": 3600, "keys": {"reading": "x"}},
            {"type": "mock", "id": "retry-ok", "value": 5, "interval": 3600, "keys": {"reading": "y"}}
        ]),
        &clock,
    );

    assert_eq!(number(&collector.collect(), "y"), Some(5.0));

    for cycle in 2..=4 {
        clock.advance(1.0);
        assert!(collector.collect().is_empty());
        assert_eq!(reads("retry-dead"), cycle);
    }

    // The healthy bundle stays gated by its interval.
    assert_eq!(reads("retry-ok"), 1);
}

#[test]
fn test_booleans_pass_through_unmodified() {
    let clock = ManualClock::default();
    let mut collector = collector(
        json!([{
            "type": "mock", "id": "sump", "value": 1,
            "keys": {"reading": "level", "leak": "leak_detected"},
            "smoothing": {"leak_detected": 5},
            "ranges": {"leak_detected": {"min": 2, "max": 3}}
        }]),
        &clock,
    );

    let telemetry = collector.collect();
    assert_eq!(telemetry["leak_detected"].as_bool(), Some(false));
    assert_eq!(number(&telemetry, "level"), Some(1.0));
}
