//! Integration tests for osclink
//!
//! Full controller flows against the scripted mock peer: probing, parameter
//! reads, range discovery, and the sweep→store→calibrate pipeline.

mod common;

use common::{parameter_peer, MockPeer};
use osclink::control::CurveModel;
use osclink::protocol::OscMessage;
use osclink::{CalibrationRequest, Controller, OscError};

// =============================================================================
// Probe Tests
// =============================================================================

#[test]
fn test_probe_round_trip() {
    let peer = MockPeer::spawn(|request| {
        if request.address == "/live/test" {
            vec![OscMessage::bare("/live/test")]
        } else {
            vec![]
        }
    });

    let controller = Controller::connect(peer.config()).unwrap();
    controller.probe().expect("probe should succeed");
}

#[test]
fn test_probe_times_out_against_silent_peer() {
    let peer = MockPeer::spawn(|_| vec![]);
    let controller = Controller::connect(peer.config()).unwrap();

    match controller.probe() {
        Err(OscError::Timeout { address, .. }) => assert_eq!(address, "/live/test"),
        other => panic!("expected Timeout, got {other:?}"),
    }
}

// =============================================================================
// Parameter Read Tests
// =============================================================================

#[test]
fn test_parameter_value_display_and_range() {
    let peer = parameter_peer(vec![20.0, 0.0], vec![20000.0, 1.0], |v| {
        format!("{:.1} Hz", 20.0 + v * 1000.0)
    });
    let controller = Controller::connect(peer.config()).unwrap();

    let value = controller.get_parameter_value(0, 0, 0).unwrap();
    assert_eq!(value, 0.0);

    let display = controller.get_parameter_display(0, 0, 0).unwrap();
    assert_eq!(display, "20.0 Hz");

    let range = controller.parameter_range(0, 0, 0).expect("range");
    assert_eq!(range.min, 20.0);
    assert_eq!(range.max, 20000.0);

    let range = controller.parameter_range(0, 0, 1).expect("second param range");
    assert_eq!(range.min, 0.0);
    assert_eq!(range.max, 1.0);
}

#[test]
fn test_parameter_read_timeout_is_typed() {
    let peer = MockPeer::spawn(|_| vec![]);
    let controller = Controller::connect(peer.config()).unwrap();

    match controller.get_parameter_value(0, 0, 0) {
        Err(OscError::Timeout { .. }) => {}
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[test]
fn test_degraded_parameter_read_reports_transport_unavailable() {
    let occupier = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken_port = occupier.local_addr().unwrap().port();

    let peer = MockPeer::spawn(|_| vec![]);
    let mut config = peer.config();
    config.response_port = taken_port;

    let controller = Controller::connect(config).unwrap();
    match controller.get_parameter_value(0, 0, 0) {
        Err(OscError::TransportUnavailable) => {}
        other => panic!("expected TransportUnavailable, got {other:?}"),
    }
}

// =============================================================================
// Sweep → Store → Calibrate Pipeline
// =============================================================================

#[test]
fn test_sweep_learns_curve_and_seeds_calibration() {
    let peer = parameter_peer(vec![20.0], vec![20000.0], |v| {
        format!("{:.1} Hz", 20.0 * 1000f32.powf(v))
    });
    let config = peer.config();
    let store_path = config.calibration_path.clone();
    let controller = Controller::connect(config).unwrap();

    let outcome = controller.sweep_parameter(0, 0, 0).unwrap();
    assert_eq!(outcome.points.len(), 11);
    assert_eq!(outcome.parsed_points, 11);
    assert_eq!(outcome.curve_model, CurveModel::Log);
    assert!(store_path.exists(), "sweep must persist the store");

    // The learned curve now seeds calibration directly
    let request = CalibrationRequest::new(0, 0, 0, 500.0).tolerance_pct(5.0);
    let result = controller.calibrate(&request);

    assert!(result.success, "did not converge: {}", result.message);
    assert_eq!(result.method, "calibration_curve");
    assert_eq!(result.iterations, 1, "curve seed should land within tolerance immediately");

    let _ = std::fs::remove_file(store_path);
}

#[test]
fn test_sweep_with_unparsable_displays_defaults_to_linear() {
    let peer = parameter_peer(vec![0.0], vec![1.0], |_| "Wide".to_string());
    let config = peer.config();
    let store_path = config.calibration_path.clone();
    let controller = Controller::connect(config).unwrap();

    let outcome = controller.sweep_parameter(0, 0, 0).unwrap();
    assert_eq!(outcome.parsed_points, 0);
    assert_eq!(outcome.curve_model, CurveModel::Linear);

    let _ = std::fs::remove_file(store_path);
}
