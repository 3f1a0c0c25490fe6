//! Error types for osclink
//!
//! Provides a unified error type for all operations.
//!
//! Propagation policy: recoverable protocol-level conditions (timeouts,
//! unverified writes, unparsable display strings) surface as structured
//! result values (`Option`, [`crate::control::VerifiedWriteResult`],
//! [`crate::control::CalibrationResult`]) so callers can log a precise
//! diagnostic. `OscError` is reserved for programmer errors, configuration
//! problems, and I/O-level faults.

use thiserror::Error;

/// Result type alias using OscError
pub type Result<T> = std::result::Result<T, OscError>;

/// Unified error type for osclink operations
#[derive(Debug, Error)]
pub enum OscError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// The response listener failed to bind; sends degrade to
    /// fire-and-forget and no call can be correlated to a response.
    #[error("transport unavailable: response listener is not bound")]
    TransportUnavailable,

    /// No response arrived within the caller's budget.
    #[error("timeout: no response for {address} within {waited_ms} ms")]
    Timeout { address: String, waited_ms: u64 },

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    /// A response arrived but its value or display string could not be
    /// interpreted.
    #[error("unparsable response: {0}")]
    Unparsable(String),

    /// A target maps outside the parameter's discovered range even after
    /// clamping.
    #[error("target {target} outside parameter range [{min}, {max}]")]
    RangeExceeded { target: f64, min: f64, max: f64 },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Calibration Store Errors
    // -------------------------------------------------------------------------
    #[error("calibration store error: {0}")]
    Store(String),
}
