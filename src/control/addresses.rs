//! Well-known peer addresses
//!
//! Address patterns understood by the AbletonOSC-compatible bridge this
//! crate talks to. Track, device, and parameter ids travel as arguments,
//! never as path segments.

/// Connectivity probe; the peer echoes it back
pub const TEST: &str = "/live/test";

/// SET a device parameter: args `[track, device, param, value]`
pub const PARAM_SET: &str = "/live/device/set/parameter/value";

/// GET a device parameter value: args `[track, device, param]`,
/// reply `[track, device, param, value]`
pub const PARAM_GET: &str = "/live/device/get/parameter/value";

/// GET a parameter's display string: args `[track, device, param]`,
/// reply `[track, device, param, "1.2 kHz"]`
pub const PARAM_DISPLAY_GET: &str = "/live/device/get/parameter/value_string";

/// GET all parameter minimums for a device: args `[track, device]`,
/// reply `[track, device, min...]`
pub const PARAM_MINS_GET: &str = "/live/device/get/parameters/min";

/// GET all parameter maximums for a device: args `[track, device]`,
/// reply `[track, device, max...]`
pub const PARAM_MAXS_GET: &str = "/live/device/get/parameters/max";
