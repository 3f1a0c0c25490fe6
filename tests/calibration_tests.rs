//! Calibration Tests
//!
//! Display parsing, the percentage policy, curve storage, and convergence
//! against synthetic linear and logarithmic peers.

mod common;

use common::parameter_peer;
use osclink::control::{
    detect_curve_model, parse_display_value, reinterpret_percentage, CalibrationStore, CurveModel,
    CurvePoint, ParamCurve, ParameterRange, Unit,
};
use osclink::{CalibrationRequest, Controller};

// =============================================================================
// Display Parser Tests
// =============================================================================

#[test]
fn test_parses_plain_numbers() {
    assert_eq!(parse_display_value("440").base_value, Some(440.0));
    assert_eq!(parse_display_value("-3.5").base_value, Some(-3.5));
}

#[test]
fn test_parses_frequencies_with_khz_conversion() {
    let parsed = parse_display_value("500 Hz");
    assert_eq!(parsed.base_value, Some(500.0));
    assert_eq!(parsed.unit, Some(Unit::Hertz));

    let parsed = parse_display_value("1.2 kHz");
    assert_eq!(parsed.base_value, Some(1200.0));
    assert_eq!(parsed.unit, Some(Unit::Hertz));
}

#[test]
fn test_parses_decibels_and_percent() {
    assert_eq!(parse_display_value("-12.0 dB").base_value, Some(-12.0));

    let parsed = parse_display_value("25 %");
    assert_eq!(parsed.base_value, Some(25.0));
    assert_eq!(parsed.unit, Some(Unit::Percent));
}

#[test]
fn test_parses_ratios() {
    let parsed = parse_display_value("4.0 : 1");
    assert_eq!(parsed.base_value, Some(4.0));
    assert_eq!(parsed.unit, Some(Unit::Ratio));
    assert_eq!(parse_display_value("2:1").base_value, Some(2.0));
}

#[test]
fn test_converts_seconds_to_milliseconds() {
    let parsed = parse_display_value("1.5 s");
    assert_eq!(parsed.base_value, Some(1500.0));
    assert_eq!(parsed.unit, Some(Unit::Milliseconds));
    assert_eq!(parse_display_value("120 ms").base_value, Some(120.0));
}

#[test]
fn test_rejects_unparsable_displays() {
    assert_eq!(parse_display_value("").base_value, None);
    assert_eq!(parse_display_value("Wide").base_value, None);
    assert_eq!(parse_display_value("-inf dB").base_value, None);
}

// =============================================================================
// Percentage Policy Tests
// =============================================================================

fn normalized_range() -> Option<ParameterRange> {
    Some(ParameterRange { min: 0.0, max: 1.0 })
}

#[test]
fn test_percentage_applies_within_normalized_range() {
    assert_eq!(reinterpret_percentage(25.0, normalized_range()), 0.25);
    assert_eq!(reinterpret_percentage(100.0, normalized_range()), 1.0);
}

#[test]
fn test_percentage_leaves_in_range_targets_alone() {
    assert_eq!(reinterpret_percentage(0.4, normalized_range()), 0.4);
    assert_eq!(reinterpret_percentage(1.0, normalized_range()), 1.0);
}

#[test]
fn test_percentage_ignores_targets_above_100() {
    assert_eq!(reinterpret_percentage(250.0, normalized_range()), 250.0);
}

#[test]
fn test_percentage_ignores_non_normalized_ranges() {
    let hz = Some(ParameterRange { min: 20.0, max: 20000.0 });
    assert_eq!(reinterpret_percentage(25.0, hz), 25.0);
    assert_eq!(reinterpret_percentage(25.0, None), 25.0);
}

// =============================================================================
// Curve Model Tests
// =============================================================================

fn points_from(pairs: &[(f64, f64)]) -> Vec<CurvePoint> {
    pairs
        .iter()
        .map(|&(normalized, value)| CurvePoint {
            normalized,
            display: format!("{value} Hz"),
            base_value: Some(value),
        })
        .collect()
}

#[test]
fn test_detects_linear_curves() {
    let points = points_from(&[(0.0, 0.0), (0.25, 25.0), (0.5, 50.0), (0.75, 75.0), (1.0, 100.0)]);
    assert_eq!(detect_curve_model(&points), CurveModel::Linear);
}

#[test]
fn test_detects_log_curves() {
    // 20 Hz .. 20 kHz over three decades
    let points: Vec<CurvePoint> = (0..=10)
        .map(|i| {
            let n = i as f64 / 10.0;
            let v = 20.0 * 1000f64.powf(n);
            CurvePoint {
                normalized: n,
                display: format!("{v:.1} Hz"),
                base_value: Some(v),
            }
        })
        .collect();
    assert_eq!(detect_curve_model(&points), CurveModel::Log);
}

#[test]
fn test_too_few_points_default_to_linear() {
    let points = points_from(&[(0.0, 1.0), (1.0, 10.0)]);
    assert_eq!(detect_curve_model(&points), CurveModel::Linear);
}

// =============================================================================
// Store Tests
// =============================================================================

#[test]
fn test_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.json");

    let mut store = CalibrationStore::load(&path).unwrap();
    assert!(store.is_empty());

    store.upsert(
        0,
        2,
        ParamCurve {
            param_index: 7,
            curve_model: CurveModel::Linear,
            points: points_from(&[(0.0, 0.0), (0.5, 50.0), (1.0, 100.0)]),
            calibrated_at: 1_700_000_000,
        },
    );
    store.save().unwrap();

    let reloaded = CalibrationStore::load(&path).unwrap();
    assert_eq!(reloaded.len(), 1);
    let curve = reloaded.curve(0, 2, 7).expect("stored curve");
    assert_eq!(curve.curve_model, CurveModel::Linear);
    assert_eq!(curve.points.len(), 3);
}

#[test]
fn test_curve_inversion_linear() {
    let curve = ParamCurve {
        param_index: 0,
        curve_model: CurveModel::Linear,
        points: points_from(&[(0.0, 0.0), (0.5, 50.0), (1.0, 100.0)]),
        calibrated_at: 0,
    };
    let n = curve.value_to_normalized(25.0).unwrap();
    assert!((n - 0.25).abs() < 1e-9);

    // Out-of-span targets clamp to the edges
    assert_eq!(curve.value_to_normalized(-10.0), Some(0.0));
    assert_eq!(curve.value_to_normalized(500.0), Some(1.0));
}

#[test]
fn test_curve_inversion_log() {
    let points: Vec<CurvePoint> = (0..=10)
        .map(|i| {
            let n = i as f64 / 10.0;
            let v = 20.0 * 1000f64.powf(n);
            CurvePoint {
                normalized: n,
                display: String::new(),
                base_value: Some(v),
            }
        })
        .collect();
    let curve = ParamCurve {
        param_index: 0,
        curve_model: CurveModel::Log,
        points,
        calibrated_at: 0,
    };

    // 20 * 1000^n = 500  =>  n ≈ 0.4660
    let n = curve.value_to_normalized(500.0).unwrap();
    assert!((n - 0.4660).abs() < 0.01, "got {n}");
}

// =============================================================================
// Convergence Tests (synthetic peers)
// =============================================================================

/// Scenario: a log-mapped frequency parameter (20 Hz .. 20 kHz over [0, 1])
/// reaches a 500 Hz target within 4 iterations at 5% tolerance.
#[test]
fn test_converges_on_log_mapped_peer() {
    let peer = parameter_peer(vec![20.0], vec![20000.0], |v| {
        format!("{:.1} Hz", 20.0 * 1000f32.powf(v))
    });
    let controller = Controller::connect(peer.config()).unwrap();

    let request = CalibrationRequest::new(0, 0, 0, 500.0)
        .max_iterations(4)
        .tolerance_pct(5.0);
    let result = controller.calibrate(&request);

    assert!(result.success, "did not converge: {}", result.message);
    assert!(result.iterations <= 4);
    let parsed = result.final_parsed.expect("parsed readback");
    assert!((parsed - 500.0).abs() <= 25.0, "readback {parsed}");
}

/// With no range information the seed is the midpoint and the proportional
/// correction has to do the work.
#[test]
fn test_converges_on_linear_peer_without_range() {
    let peer = parameter_peer(vec![], vec![], |v| format!("{:.2}", v * 100.0));
    let controller = Controller::connect(peer.config()).unwrap();

    let request = CalibrationRequest::new(0, 0, 0, 42.0)
        .max_iterations(5)
        .tolerance_pct(5.0);
    let result = controller.calibrate(&request);

    assert!(result.success, "did not converge: {}", result.message);
    let parsed = result.final_parsed.expect("parsed readback");
    assert!((parsed - 42.0).abs() <= 2.1, "readback {parsed}");
}

/// A percentage-style target against a normalized parameter: 25 means 25%.
#[test]
fn test_percentage_target_converges() {
    let peer = parameter_peer(vec![0.0], vec![1.0], |v| format!("{:.0} %", v * 100.0));
    let controller = Controller::connect(peer.config()).unwrap();

    let request = CalibrationRequest::new(0, 0, 0, 25.0).tolerance_pct(5.0);
    let result = controller.calibrate(&request);

    assert!(result.success, "did not converge: {}", result.message);
    assert_eq!(result.method, "percentage");
    assert!((result.final_normalized - 0.25).abs() < 0.05);
}

/// An always-unparsable display terminates at the iteration cap with
/// success = false, never an infinite loop.
#[test]
fn test_unparsable_display_terminates() {
    let peer = parameter_peer(vec![0.0], vec![1.0], |_| "Wide".to_string());
    let controller = Controller::connect(peer.config()).unwrap();

    let request = CalibrationRequest::new(0, 0, 0, 0.7).max_iterations(3);
    let result = controller.calibrate(&request);

    assert!(!result.success);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.final_display.as_deref(), Some("Wide"));
    assert_eq!(result.final_parsed, None);
}

/// A target beyond the reachable span pins at the clamp bound and reports
/// failure instead of looping.
#[test]
fn test_out_of_range_target_reports_failure() {
    // Display tops out at 100 even at full deflection
    let peer = parameter_peer(vec![0.0], vec![1.0], |v| format!("{:.2}", v * 100.0));
    let controller = Controller::connect(peer.config()).unwrap();

    let request = CalibrationRequest::new(0, 0, 0, 200.0).max_iterations(6);
    let result = controller.calibrate(&request);

    assert!(!result.success);
    assert!(result.iterations <= 6);
    assert!(result.message.contains("outside reachable range"), "{}", result.message);
}
