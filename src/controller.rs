//! Controller Module
//!
//! The public face of the crate: owns the transport and the calibration
//! store, and exposes the control-layer calls upstream collaborators use.
//!
//! ## Responsibilities
//! - Construct the transport from a `Config` (dependency injection, no
//!   process-wide singleton)
//! - Route sends, correlated reads, verified writes, and calibration
//! - Hold the calibration store behind its own lock
//!
//! ## Concurrency Model
//!
//! Every public call blocks on the caller's thread; the only background
//! activity is the transport's receive loop. Concurrent callers must use
//! separate threads, and must not issue concurrent requests to the same
//! address (single-flight per correlation key; OSC has no correlation id).

use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::control::{
    self, addresses, correlator, CalibrationRequest, CalibrationResult, CalibrationStore,
    ParameterRange, SweepOutcome, VerifiedWrite, VerifiedWriteResult,
};
use crate::error::{OscError, Result};
use crate::protocol::{OscArg, OscMessage};
use crate::transport::Transport;

/// Remote-control client for one workstation peer
pub struct Controller {
    config: Config,
    transport: Transport,

    /// Learned calibration curves; exclusive access for load/save cycles
    store: Mutex<CalibrationStore>,
}

impl Controller {
    /// Connect to the peer described by `config`.
    ///
    /// Starts the response listener. A response-port bind failure does not
    /// fail construction; the controller degrades to fire-and-forget (see
    /// [`Transport`]). A missing calibration store file yields an empty
    /// store.
    pub fn connect(config: Config) -> Result<Self> {
        let transport = Transport::bind(&config)?;
        let store = CalibrationStore::load(&config.calibration_path)?;

        tracing::info!(
            "connected to {} (listening: {})",
            transport.peer_addr(),
            transport.is_listening()
        );

        Ok(Self {
            config,
            transport,
            store: Mutex::new(store),
        })
    }

    /// The configuration this controller was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether responses can be correlated (listener bound and running)
    pub fn is_listening(&self) -> bool {
        self.transport.is_listening()
    }

    /// The transport, for callers composing their own control flows
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // =========================================================================
    // Core Calls
    // =========================================================================

    /// Fire-and-forget send
    pub fn send(&self, address: &str, args: Vec<OscArg>) -> Result<()> {
        self.transport.send(&OscMessage::new(address, args))
    }

    /// Send and wait for a fresh matching response.
    ///
    /// `accept_addresses` defaults to `[address, address + "/response"]`;
    /// the peer's response-addressing convention is inferred defensively,
    /// not a guaranteed contract. Callers must serialize calls per address.
    pub fn send_and_wait(
        &self,
        address: &str,
        args: &[OscArg],
        timeout: Duration,
        accept_addresses: Option<&[String]>,
    ) -> Option<(String, Vec<OscArg>)> {
        correlator::send_and_wait(&self.transport, address, args, timeout, accept_addresses)
    }

    /// Run a verified write (SET→GET→compare with backoff).
    ///
    /// `Err` only on invalid arguments; transport-level failures surface in
    /// the result's `verified`/`actual` fields.
    pub fn verified_write(&self, write: &VerifiedWrite) -> Result<VerifiedWriteResult> {
        control::verified::run(&self.transport, write)
    }

    /// Converge a parameter onto a target display value
    pub fn calibrate(&self, request: &CalibrationRequest) -> CalibrationResult {
        let store = self.store.lock();
        control::calibrate::run(&self.transport, &store, &self.config, request)
    }

    // =========================================================================
    // Parameter Helpers
    // =========================================================================

    /// Current value of a device parameter
    pub fn get_parameter_value(&self, track: i32, device: i32, param: usize) -> Result<f64> {
        let args = param_args(track, device, param);
        let reply = self.require_reply(addresses::PARAM_GET, &args)?;
        reply
            .iter()
            .rev()
            .find_map(OscArg::as_number)
            .ok_or_else(|| {
                OscError::Unparsable(format!("{}: no numeric value in reply", addresses::PARAM_GET))
            })
    }

    /// Current display string of a device parameter
    pub fn get_parameter_display(&self, track: i32, device: i32, param: usize) -> Result<String> {
        let args = param_args(track, device, param);
        let reply = self.require_reply(addresses::PARAM_DISPLAY_GET, &args)?;
        reply
            .iter()
            .rev()
            .find_map(OscArg::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                OscError::Unparsable(format!("{}: no display string in reply", addresses::PARAM_DISPLAY_GET))
            })
    }

    /// TTL-cached `[min, max]` range of a device parameter
    pub fn parameter_range(
        &self,
        track: i32,
        device: i32,
        param: usize,
    ) -> Option<ParameterRange> {
        control::ranges::parameter_range(
            &self.transport,
            track,
            device,
            param,
            self.config.range_ttl,
            self.config.reply_timeout(),
        )
    }

    /// Sweep a parameter, classify its curve, and persist it to the store
    pub fn sweep_parameter(&self, track: i32, device: i32, param: usize) -> Result<SweepOutcome> {
        let outcome = control::sweep::sweep_parameter(
            &self.transport,
            track,
            device,
            param,
            Duration::from_millis(self.config.sweep_settle_ms),
            self.config.reply_timeout(),
        );

        let mut store = self.store.lock();
        store.upsert(track, device, outcome.clone().into_curve());
        store.save()?;
        Ok(outcome)
    }

    /// Connectivity probe: send `/live/test` and wait for the echo
    pub fn probe(&self) -> Result<()> {
        if !self.is_listening() {
            return Err(OscError::TransportUnavailable);
        }
        let timeout = self.config.reply_timeout();
        match self.send_and_wait(addresses::TEST, &[], timeout, None) {
            Some(_) => Ok(()),
            None => Err(OscError::Timeout {
                address: addresses::TEST.to_string(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Stop the response listener (best-effort; also runs on drop)
    pub fn shutdown(&self) {
        self.transport.shutdown();
    }

    /// Correlated read that promotes "no response" into a typed error
    fn require_reply(&self, address: &str, args: &[OscArg]) -> Result<Vec<OscArg>> {
        if !self.is_listening() {
            return Err(OscError::TransportUnavailable);
        }
        let timeout = self.config.reply_timeout();
        self.send_and_wait(address, args, timeout, None)
            .map(|(_addr, reply)| reply)
            .ok_or_else(|| OscError::Timeout {
                address: address.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
    }
}

fn param_args(track: i32, device: i32, param: usize) -> Vec<OscArg> {
    vec![
        OscArg::Int(track),
        OscArg::Int(device),
        OscArg::Int(param as i32),
    ]
}
