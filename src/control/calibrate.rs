//! Calibration loop
//!
//! Many remote parameters accept only a normalized `[0, 1]` value but are
//! discussed in display units (Hz, dB, ratio) through an unknown, often
//! nonlinear mapping. This loop converges iteratively: set an estimate,
//! read the display string back, parse it, and scale the estimate by
//! `target / parsed` until the readback lands within tolerance or the
//! iteration cap fires.

use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::control::ranges::{self, ParameterRange};
use crate::control::store::CalibrationStore;
use crate::control::{addresses, correlator, display};
use crate::protocol::{OscArg, OscMessage};
use crate::transport::Transport;

/// One calibration call
#[derive(Debug, Clone)]
pub struct CalibrationRequest {
    pub track: i32,
    pub device: i32,
    pub param: usize,

    /// Target in display units (e.g. `500.0` for 500 Hz)
    pub target: f64,

    /// Hard iteration cap; prevents runaway loops when the display string
    /// is unparsable or the mapping is non-monotonic
    pub max_iterations: u32,

    /// Acceptable error as a percentage of the target
    pub tolerance_pct: f64,
}

impl CalibrationRequest {
    /// Create a request with the default cap (5) and tolerance (5%)
    pub fn new(track: i32, device: i32, param: usize, target: f64) -> Self {
        Self {
            track,
            device,
            param,
            target,
            max_iterations: 5,
            tolerance_pct: 5.0,
        }
    }

    /// Override the iteration cap
    pub fn max_iterations(mut self, cap: u32) -> Self {
        self.max_iterations = cap;
        self
    }

    /// Override the tolerance percentage
    pub fn tolerance_pct(mut self, pct: f64) -> Self {
        self.tolerance_pct = pct;
        self
    }
}

/// Outcome of one calibration call. Scoped to the call, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    /// The readback converged within tolerance
    pub success: bool,

    /// Target in display units (after percentage reinterpretation, if any)
    pub target_value: f64,

    /// Last display string read back
    pub final_display: Option<String>,

    /// Last parsed base value
    pub final_parsed: Option<f64>,

    /// Last normalized value written
    pub final_normalized: f64,

    /// Iterations used
    pub iterations: u32,

    /// How the initial estimate was seeded
    pub method: String,

    /// Human-readable diagnostic
    pub message: String,
}

/// Percentage reinterpretation policy.
///
/// When a parameter's true range lies within `[0, 1]` but the caller's
/// target reads like a percentage (`1.0 < target <= 100.0`), the target is
/// reinterpreted as `target / 100`. Returns the possibly-rewritten target.
pub fn reinterpret_percentage(target: f64, range: Option<ParameterRange>) -> f64 {
    match range {
        Some(r) if r.is_normalized() && target > 1.0 && target <= 100.0 => target / 100.0,
        _ => target,
    }
}

/// Initial normalized estimate when no stored curve applies.
///
/// With a known positive range spanning at least two decades the guess is
/// log-positioned (frequency-style parameters); with any other known range
/// it is linear; with no range at all it is `0.5`.
fn naive_guess(target: f64, range: Option<ParameterRange>) -> (f64, &'static str) {
    let Some(r) = range else {
        return (0.5, "midpoint_guess");
    };
    if r.min > 0.0 && r.max / r.min >= 100.0 && target > 0.0 {
        let guess = (target.ln() - r.min.ln()) / (r.max.ln() - r.min.ln());
        return (guess.clamp(0.0, 1.0), "log_guess");
    }
    if (r.max - r.min).abs() > f64::EPSILON {
        let guess = (target - r.min) / (r.max - r.min);
        return (guess.clamp(0.0, 1.0), "linear_guess");
    }
    (0.5, "midpoint_guess")
}

/// Clamp an estimate to `[0, 1]`, narrowed to the discovered true range
/// when that range itself lies within the normalized interval (display-unit
/// ranges like `[20, 20000]` say nothing about the wire value and only the
/// `[0, 1]` clamp applies)
fn clamp_estimate(estimate: f64, range: Option<ParameterRange>) -> f64 {
    match range {
        Some(r) if r.is_normalized() && r.max > r.min => estimate.clamp(r.min, r.max),
        _ => estimate.clamp(0.0, 1.0),
    }
}

/// Run the calibration loop.
pub(crate) fn run(
    transport: &Transport,
    store: &CalibrationStore,
    config: &Config,
    request: &CalibrationRequest,
) -> CalibrationResult {
    let timeout = config.reply_timeout();
    let range = ranges::parameter_range(
        transport,
        request.track,
        request.device,
        request.param,
        config.range_ttl,
        timeout,
    );

    let target = reinterpret_percentage(request.target, range);
    let percent_rewritten = target != request.target;

    // Seed: fresh stored curve first, naive guess otherwise
    let (mut estimate, mut method) = match store
        .curve(request.track, request.device, request.param)
        .filter(|curve| curve.is_fresh(config.calibration_ttl))
        .and_then(|curve| curve.value_to_normalized(target))
    {
        Some(seed) => (seed, "calibration_curve"),
        None => naive_guess(target, range),
    };
    if percent_rewritten {
        method = "percentage";
    }
    estimate = clamp_estimate(estimate, range);

    tracing::debug!(
        "calibrate t{}.d{}.p{}: target {target}, seed {estimate:.6} ({method})",
        request.track,
        request.device,
        request.param
    );

    let mut result = CalibrationResult {
        success: false,
        target_value: target,
        final_display: None,
        final_parsed: None,
        final_normalized: estimate,
        iterations: 0,
        method: method.to_string(),
        message: String::new(),
    };

    for iteration in 1..=request.max_iterations {
        result.iterations = iteration;
        result.final_normalized = estimate;

        let set_args = vec![
            OscArg::Int(request.track),
            OscArg::Int(request.device),
            OscArg::Int(request.param as i32),
            OscArg::Float(estimate as f32),
        ];
        if let Err(e) = transport.send(&OscMessage::new(addresses::PARAM_SET, set_args)) {
            tracing::warn!("iteration {iteration}: SET failed: {e}");
        }
        std::thread::sleep(config.settle());

        let display_str = read_display(transport, request, timeout);
        result.final_display = display_str.clone();

        let Some(display_str) = display_str else {
            result.message = format!("no readback on iteration {iteration}");
            continue;
        };
        let parsed_value = display::parse_display_value(&display_str);
        result.final_parsed = parsed_value.base_value;

        let Some(mut parsed) = parsed_value.base_value else {
            result.message = format!("unparsable readback {display_str:?}");
            tracing::debug!("iteration {iteration}: {}", result.message);
            continue;
        };

        // A percent-reinterpreted target lives in normalized units; bring a
        // percent-unit readback into the same space before comparing
        if percent_rewritten && parsed_value.unit == Some(display::Unit::Percent) {
            parsed /= 100.0;
        }

        // Convergence check: relative to the target, absolute around zero
        let threshold = if target == 0.0 {
            1.0
        } else {
            target.abs() * request.tolerance_pct / 100.0
        };
        let diff = (parsed - target).abs();
        if diff <= threshold {
            result.success = true;
            result.message = format!(
                "converged in {iteration} iteration(s): target {target}, readback {parsed}"
            );
            tracing::debug!("{}", result.message);
            return result;
        }

        // Proportional correction; a zero readback gives the ratio nothing
        // to work with, so nudge toward the target instead
        let next = if parsed.abs() < f64::EPSILON {
            estimate + if target > parsed { 0.1 } else { -0.1 }
        } else {
            estimate * (target / parsed)
        };
        let clamped = clamp_estimate(next, range);
        tracing::trace!(
            "iteration {iteration}: readback {parsed}, estimate {estimate:.6} -> {clamped:.6}"
        );

        if clamped == estimate {
            // Pinned at a clamp bound (a ratio of exactly 1.0 would have
            // converged above); more iterations cannot move the value
            result.message = format!(
                "target {target} outside reachable range: estimate pinned at {clamped}"
            );
            return result;
        }
        estimate = clamped;
    }

    if result.message.is_empty() {
        result.message = format!(
            "did not converge after {} iteration(s)",
            request.max_iterations
        );
    } else {
        result.message = format!(
            "gave up after {} iteration(s): {}",
            request.max_iterations, result.message
        );
    }
    result
}

/// Read the display string, falling back to the numeric value formatted as
/// a string when the peer has no display endpoint
fn read_display(
    transport: &Transport,
    request: &CalibrationRequest,
    timeout: Duration,
) -> Option<String> {
    let get_args = [
        OscArg::Int(request.track),
        OscArg::Int(request.device),
        OscArg::Int(request.param as i32),
    ];

    let reply = correlator::send_and_wait(
        transport,
        addresses::PARAM_DISPLAY_GET,
        &get_args,
        timeout,
        None,
    );
    if let Some((_addr, args)) = reply {
        if let Some(s) = args.iter().rev().find_map(OscArg::as_str) {
            return Some(s.to_string());
        }
    }

    let reply =
        correlator::send_and_wait(transport, addresses::PARAM_GET, &get_args, timeout, None);
    reply
        .and_then(|(_addr, args)| args.iter().rev().find_map(OscArg::as_number))
        .map(|v| v.to_string())
}
