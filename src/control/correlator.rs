//! Request/response correlator
//!
//! Turns a fire-and-forget send plus the listener's asynchronous receive
//! into a bounded synchronous call.
//!
//! OSC carries no correlation id, so matching is by address and by time: a
//! cached response satisfies a request only if it was received at or after
//! the request's send time. Concurrent calls to the *same* address are not
//! distinguishable; callers must serialize per correlation key
//! (single-flight).

use std::time::{Duration, Instant};

use crate::protocol::{OscArg, OscMessage};
use crate::transport::Transport;

/// The peer's response-addressing convention varies; by default we accept
/// the request address itself and the `/response`-suffixed variant.
pub fn default_accept_addresses(address: &str) -> Vec<String> {
    vec![address.to_string(), format!("{address}/response")]
}

/// Send `address(args)` and wait for a matching fresh response.
///
/// Returns `(response_address, response_args)`, or `None` when the transport
/// is degraded, the send fails, or no acceptable response arrives within
/// `timeout`. A response is accepted only if its cache timestamp is at or
/// after the send time recorded here; a stale reply from a previous call
/// never satisfies a new request.
pub fn send_and_wait(
    transport: &Transport,
    address: &str,
    args: &[OscArg],
    timeout: Duration,
    accept_addresses: Option<&[String]>,
) -> Option<(String, Vec<OscArg>)> {
    let sent_at = Instant::now();
    let msg = OscMessage::new(address, args.to_vec());

    if !transport.is_listening() {
        // Degraded: the SET half of the world still works, but the reply
        // (if any) has nowhere to land. Send and report "no response".
        if let Err(e) = transport.send(&msg) {
            tracing::debug!("degraded send of {address} failed: {e}");
        }
        return None;
    }

    if let Err(e) = transport.send(&msg) {
        tracing::warn!("send of {address} failed: {e}");
        return None;
    }

    let owned;
    let accept: &[String] = match accept_addresses {
        Some(list) => list,
        None => {
            owned = default_accept_addresses(address);
            &owned
        }
    };

    let response = transport.cache().wait_matching(accept, sent_at, timeout);
    if response.is_none() {
        tracing::debug!(
            "no response for {address} within {} ms",
            timeout.as_millis()
        );
    }
    response
}
