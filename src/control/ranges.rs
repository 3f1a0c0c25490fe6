//! Parameter range discovery
//!
//! Fetches the true `[min, max]` lists for a device's parameters and caches
//! them with a TTL so every write does not re-query the peer.

use std::time::Duration;

use crate::control::{addresses, correlator};
use crate::protocol::OscArg;
use crate::transport::Transport;

/// `[min, max]` for a single parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    /// Whether the whole range lies within the normalized `[0, 1]` interval
    pub fn is_normalized(&self) -> bool {
        self.min >= 0.0 && self.max <= 1.0
    }
}

/// Range for one parameter of `(track, device)`, from the TTL cache or the
/// peer.
///
/// Replies carry `[track, device, min0, min1, ...]`; the leading two ids are
/// skipped. `None` when the peer does not answer or the parameter index is
/// out of bounds; callers fall back to the normalized `[0, 1]` default.
pub fn parameter_range(
    transport: &Transport,
    track: i32,
    device: i32,
    param: usize,
    ttl: Duration,
    timeout: Duration,
) -> Option<ParameterRange> {
    if let Some(entry) = transport.cache().range(track, device, ttl) {
        return pick(&entry.mins, &entry.maxs, param);
    }

    let mins = fetch_list(transport, addresses::PARAM_MINS_GET, track, device, timeout)?;
    let maxs = fetch_list(transport, addresses::PARAM_MAXS_GET, track, device, timeout)?;
    let range = pick(&mins, &maxs, param);
    transport.cache().put_range(track, device, mins, maxs);
    range
}

fn pick(mins: &[f64], maxs: &[f64], param: usize) -> Option<ParameterRange> {
    match (mins.get(param), maxs.get(param)) {
        (Some(&min), Some(&max)) => Some(ParameterRange { min, max }),
        _ => None,
    }
}

/// One min/max list query; numeric args after the two echoed ids
fn fetch_list(
    transport: &Transport,
    address: &str,
    track: i32,
    device: i32,
    timeout: Duration,
) -> Option<Vec<f64>> {
    let args = [OscArg::Int(track), OscArg::Int(device)];
    let (_addr, reply) = correlator::send_and_wait(transport, address, &args, timeout, None)?;

    let values: Vec<f64> = reply
        .iter()
        .skip(2)
        .filter_map(OscArg::as_number)
        .collect();
    if values.is_empty() {
        tracing::debug!("{address} reply for t{track}.d{device} carried no values");
        return None;
    }
    Some(values)
}
