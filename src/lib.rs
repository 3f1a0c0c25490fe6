//! # osclink
//!
//! Remote control of a running audio workstation over a UDP/OSC control
//! link, with:
//! - A binary OSC-1.0 subset codec (int32/float32/string, 4-byte padding)
//! - A request/response correlator over a connectionless, unordered,
//!   fire-and-forget transport
//! - Verified writes (SET→GET→compare with exponential backoff)
//! - Display-value calibration (iterative convergence of a normalized
//!   `[0, 1]` value onto a target in Hz/dB/%/ratio)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Controller                             │
//! │         send / send_and_wait / verified_write / calibrate    │
//! └───────────┬─────────────────────────────────┬───────────────┘
//!             │                                 │
//! ┌───────────▼───────────────┐    ┌────────────▼───────────────┐
//! │        Control Loops      │    │     Calibration Store      │
//! │  correlator · verified ·  │    │      (JSON curves)         │
//! │  calibrate · sweep        │    └────────────────────────────┘
//! └───────────┬───────────────┘
//!             │
//! ┌───────────▼───────────────┐
//! │        Transport          │──── UDP ───▶ peer (command port)
//! │  socket · listener thread │◀─── UDP ──── peer (response port)
//! │  response / range cache   │
//! └───────────┬───────────────┘
//!             │
//! ┌───────────▼───────────────┐
//! │          Codec            │
//! │   OSC encode / decode     │
//! └───────────────────────────┘
//! ```
//!
//! ## Delivery Model
//!
//! UDP gives no ordering and no delivery guarantee, and OSC carries no
//! correlation id. Responses are matched by address and by time (a reply
//! must have been received at or after the request was sent), which makes
//! one outstanding request per address the caller's contract.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod control;
pub mod controller;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use control::{CalibrationRequest, CalibrationResult, VerifiedWrite, VerifiedWriteResult};
pub use controller::Controller;
pub use error::{OscError, Result};
pub use protocol::{OscArg, OscMessage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of osclink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
