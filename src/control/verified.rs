//! Verified write controller
//!
//! SET→GET→compare retry loop with exponential backoff. The transport gives
//! no delivery guarantee, so a bare SET may silently vanish; reading the
//! value back is the only confirmation available.

use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::control::correlator;
use crate::error::{OscError, Result};
use crate::protocol::{OscArg, OscMessage};
use crate::transport::Transport;

/// Default float comparison tolerance
const FLOAT_TOLERANCE: f64 = 0.01;

/// Custom comparison for a verified write: `(expected, actual) -> matches`
pub type Comparator = fn(f64, f64) -> bool;

/// Specification of one verified write
#[derive(Debug, Clone)]
pub struct VerifiedWrite {
    /// SET command address and arguments (fire-and-forget)
    pub set_address: String,
    pub set_args: Vec<OscArg>,

    /// GET readback address and arguments
    pub get_address: String,
    pub get_args: Vec<OscArg>,

    /// Value expected in the readback; must be `Int` or `Float`
    pub expected: OscArg,

    /// Comparison override. Default: exact match for ints,
    /// `|actual - expected| < 0.01` for floats.
    pub compare: Option<Comparator>,

    /// Maximum attempts
    pub retries: u32,

    /// Initial backoff delay before the first readback
    pub base_delay: Duration,

    /// Backoff cap
    pub max_delay: Duration,

    /// Per-attempt GET timeout
    pub timeout: Duration,
}

impl VerifiedWrite {
    /// Create a verified write with default retry/backoff settings
    pub fn new(
        set_address: impl Into<String>,
        set_args: Vec<OscArg>,
        get_address: impl Into<String>,
        get_args: Vec<OscArg>,
        expected: OscArg,
    ) -> Self {
        Self {
            set_address: set_address.into(),
            set_args,
            get_address: get_address.into(),
            get_args,
            expected,
            compare: None,
            retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
            timeout: Duration::from_millis(2000),
        }
    }

    /// Create a verified write taking retry, backoff, and timeout defaults
    /// from `config`
    pub fn from_config(
        config: &Config,
        set_address: impl Into<String>,
        set_args: Vec<OscArg>,
        get_address: impl Into<String>,
        get_args: Vec<OscArg>,
        expected: OscArg,
    ) -> Self {
        Self::new(set_address, set_args, get_address, get_args, expected)
            .retries(config.retries)
            .base_delay(Duration::from_millis(config.base_delay_ms))
            .max_delay(Duration::from_millis(config.max_delay_ms))
            .timeout(config.reply_timeout())
    }

    /// Override the attempt count
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Override the initial backoff delay
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Override the backoff cap
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Override the per-attempt GET timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the comparison function
    pub fn compare_with(mut self, compare: Comparator) -> Self {
        self.compare = Some(compare);
        self
    }
}

/// Outcome of a verified write. Created per call, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedWriteResult {
    /// The SET was sent (presumed applied even when unverified)
    pub success: bool,

    /// A readback matched the expected value
    pub verified: bool,

    /// Attempts used
    pub attempts: u32,

    /// Expected readback value
    pub expected: f64,

    /// Last value actually read back, if any
    pub actual: Option<f64>,

    /// Human-readable diagnostic
    pub message: String,
}

/// Backoff before the readback of `attempt` (1-based):
/// `min(base * 2^(attempt-1), max)`. Non-decreasing and capped.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2f64.powi(attempt.saturating_sub(1).min(62) as i32);
    Duration::from_secs_f64((base.as_secs_f64() * factor).min(max.as_secs_f64()))
}

/// Run the SET→GET→compare loop.
///
/// When every attempt fails to confirm, the result still reports
/// `success: true, verified: false`: the transport is reliable enough in
/// practice that the SET is presumed applied; callers must treat
/// `verified: false` as "unconfirmed", not "failed".
pub(crate) fn run(transport: &Transport, write: &VerifiedWrite) -> Result<VerifiedWriteResult> {
    let expected = write.expected.as_number().ok_or_else(|| {
        OscError::InvalidArgument(format!(
            "expected value must be numeric, got {:?}",
            write.expected
        ))
    })?;
    if write.retries == 0 {
        return Err(OscError::InvalidArgument("retries must be at least 1".into()));
    }

    let matches = |actual: f64| match write.compare {
        Some(compare) => compare(expected, actual),
        None => match write.expected {
            OscArg::Int(_) => actual == expected,
            _ => (actual - expected).abs() < FLOAT_TOLERANCE,
        },
    };

    let set_msg = OscMessage::new(write.set_address.clone(), write.set_args.clone());
    let mut last_actual = None;

    for attempt in 1..=write.retries {
        if let Err(e) = transport.send(&set_msg) {
            tracing::warn!("attempt {attempt}: SET {} failed: {e}", write.set_address);
        }

        // Give the remote time to apply the change before polling
        std::thread::sleep(backoff_delay(attempt, write.base_delay, write.max_delay));

        let reply = correlator::send_and_wait(
            transport,
            &write.get_address,
            &write.get_args,
            write.timeout,
            None,
        );

        if let Some((_addr, args)) = reply {
            // The remote places the value last; trailing numeric metadata
            // is not supported.
            let actual = args.iter().rev().find_map(OscArg::as_number);
            if let Some(actual) = actual {
                last_actual = Some(actual);
                if matches(actual) {
                    tracing::debug!(
                        "{} verified after {attempt} attempt(s): {actual}",
                        write.set_address
                    );
                    return Ok(VerifiedWriteResult {
                        success: true,
                        verified: true,
                        attempts: attempt,
                        expected,
                        actual: Some(actual),
                        message: format!("verified after {attempt} attempt(s)"),
                    });
                }
                tracing::debug!(
                    "attempt {attempt}: readback {actual} does not match {expected}"
                );
            } else {
                tracing::debug!("attempt {attempt}: readback carried no numeric value");
            }
        }
    }

    Ok(VerifiedWriteResult {
        success: true,
        verified: false,
        attempts: write.retries,
        expected,
        actual: last_actual,
        message: format!("unverified after {} attempt(s)", write.retries),
    })
}
