//! Calibration sweep
//!
//! Walks a parameter through normalized 0.0..=1.0 in 0.1 steps, reads the
//! display string at each step, and classifies the mapping as linear or
//! logarithmic. The resulting curve seeds later calibration calls through
//! the store.

use std::time::Duration;

use serde::Serialize;

use crate::control::store::{unix_now, CurveModel, CurvePoint, ParamCurve};
use crate::control::{addresses, correlator, display};
use crate::protocol::OscArg;
use crate::transport::Transport;

/// Sweep step count (0.0, 0.1, .. 1.0)
const SWEEP_STEPS: usize = 11;

/// Result of sweeping one parameter
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub track: i32,
    pub device: i32,
    pub param: usize,
    pub curve_model: CurveModel,

    /// Points observed, including unparsable ones (kept for diagnostics)
    pub points: Vec<CurvePoint>,

    /// How many points carried a parseable base value
    pub parsed_points: usize,
}

impl SweepOutcome {
    /// Convert into a storable curve
    pub fn into_curve(self) -> ParamCurve {
        ParamCurve {
            param_index: self.param,
            curve_model: self.curve_model,
            points: self.points,
            calibrated_at: unix_now(),
        }
    }
}

/// Sweep `(track, device, param)` and classify its curve.
///
/// Each step writes the normalized value, waits `settle`, then reads the
/// display string back. Steps whose readback times out or fails to parse
/// are kept with `base_value: None`.
pub fn sweep_parameter(
    transport: &Transport,
    track: i32,
    device: i32,
    param: usize,
    settle: Duration,
    timeout: Duration,
) -> SweepOutcome {
    let mut points = Vec::with_capacity(SWEEP_STEPS);

    for step in 0..SWEEP_STEPS {
        let normalized = step as f64 / (SWEEP_STEPS - 1) as f64;
        let set_args = vec![
            OscArg::Int(track),
            OscArg::Int(device),
            OscArg::Int(param as i32),
            OscArg::Float(normalized as f32),
        ];
        if let Err(e) = transport.send(&crate::protocol::OscMessage::new(
            addresses::PARAM_SET,
            set_args,
        )) {
            tracing::warn!("sweep write at {normalized:.1} failed: {e}");
        }
        std::thread::sleep(settle);

        let get_args = [
            OscArg::Int(track),
            OscArg::Int(device),
            OscArg::Int(param as i32),
        ];
        let reply = correlator::send_and_wait(
            transport,
            addresses::PARAM_DISPLAY_GET,
            &get_args,
            timeout,
            None,
        );

        let display_str = reply
            .as_ref()
            .and_then(|(_, args)| args.iter().rev().find_map(OscArg::as_str))
            .unwrap_or_default()
            .to_string();
        let base_value = display::parse_display_value(&display_str).base_value;

        points.push(CurvePoint {
            normalized,
            display: display_str,
            base_value,
        });
    }

    let parsed_points = points.iter().filter(|p| p.base_value.is_some()).count();
    let curve_model = detect_curve_model(&points);
    tracing::debug!(
        "sweep t{track}.d{device}.p{param}: {parsed_points}/{} parsed, model {curve_model:?}",
        points.len()
    );

    SweepOutcome {
        track,
        device,
        param,
        curve_model,
        points,
        parsed_points,
    }
}

/// Classify a point set as linear or logarithmic.
///
/// Compares the mean absolute error of interpolating interior points from
/// the endpoints under both models; log wins only when it is a strictly
/// better fit and every parsed value is positive. Fewer than three parsed
/// points default to linear.
pub fn detect_curve_model(points: &[CurvePoint]) -> CurveModel {
    let mut usable: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.base_value.map(|v| (p.normalized, v)))
        .collect();
    usable.sort_by(|a, b| a.0.total_cmp(&b.0));

    if usable.len() < 3 {
        return CurveModel::Linear;
    }
    if usable.iter().any(|&(_, v)| v <= 0.0) {
        return CurveModel::Linear;
    }

    let (n0, v0) = usable[0];
    let (n1, v1) = usable[usable.len() - 1];
    let span = n1 - n0;
    if span.abs() < f64::EPSILON {
        return CurveModel::Linear;
    }

    let denom = (v1 - v0).abs().max(1e-9);
    let mut linear_mae = 0.0;
    let mut log_mae = 0.0;
    let interior = &usable[1..usable.len() - 1];
    for &(n, v) in interior {
        let t = (n - n0) / span;
        let linear_pred = v0 + t * (v1 - v0);
        let log_pred = (v0.ln() + t * (v1.ln() - v0.ln())).exp();
        linear_mae += (v - linear_pred).abs();
        log_mae += (v - log_pred).abs();
    }
    linear_mae /= interior.len() as f64 * denom;
    log_mae /= interior.len() as f64 * denom;

    if log_mae < linear_mae {
        CurveModel::Log
    } else {
        CurveModel::Linear
    }
}
