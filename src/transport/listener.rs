//! UDP transport and response listener
//!
//! Owns the socket, the caches, and the background receive loop. All
//! protocol logic lives elsewhere; this module owns byte I/O and cache
//! population.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{OscError, Result};
use crate::protocol::{self, OscMessage};
use crate::transport::ResponseCache;

/// Maximum UDP datagram size we accept
const MAX_DATAGRAM: usize = 65_536;

/// UDP transport bound to the local response port.
///
/// Construction never fails outright: if the response port cannot be bound
/// (typically because another control process owns it), the transport
/// degrades: sends go out from a throwaway ephemeral socket and every
/// read-based call reports "no response" instead of hanging.
pub struct Transport {
    peer: SocketAddr,
    socket: Option<Arc<UdpSocket>>,
    cache: Arc<ResponseCache>,
    running: Arc<AtomicBool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Bind the response listener and start the receive loop.
    ///
    /// Returns `Err` only when the peer address itself cannot be resolved;
    /// a bind failure degrades instead (see the type docs).
    pub fn bind(config: &Config) -> Result<Self> {
        let peer = (config.host.as_str(), config.command_port)
            .to_socket_addrs()
            .map_err(|e| OscError::Config(format!("cannot resolve peer address: {e}")))?
            .next()
            .ok_or_else(|| {
                OscError::Config(format!("peer address {}:{} resolves to nothing",
                    config.host, config.command_port))
            })?;

        let cache = Arc::new(ResponseCache::new());
        let running = Arc::new(AtomicBool::new(false));

        let socket = match UdpSocket::bind((config.host.as_str(), config.response_port)) {
            Ok(sock) => {
                sock.set_read_timeout(Some(config.recv_timeout()))?;
                Some(Arc::new(sock))
            }
            Err(e) => {
                tracing::warn!(
                    "response listener bind failed on {}:{}: {}; degrading to fire-and-forget",
                    config.host,
                    config.response_port,
                    e
                );
                None
            }
        };

        let transport = Self {
            peer,
            socket,
            cache,
            running,
            listener: Mutex::new(None),
        };
        transport.start_listener()?;
        Ok(transport)
    }

    /// Spawn the receive-loop thread (no-op in degraded mode)
    fn start_listener(&self) -> Result<()> {
        let Some(socket) = self.socket.clone() else {
            return Ok(());
        };

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let cache = Arc::clone(&self.cache);

        let handle = std::thread::Builder::new()
            .name("osc-listener".to_string())
            .spawn(move || receive_loop(socket, cache, running))?;

        *self.listener.lock() = Some(handle);
        Ok(())
    }

    /// Whether responses can be correlated (the listener is bound and running)
    pub fn is_listening(&self) -> bool {
        self.socket.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Local address of the listener socket, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Peer address commands are sent to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Shared response/range cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Encode and send a message to the peer, fire-and-forget.
    ///
    /// Sends from the listener socket so the peer's reply, addressed to the
    /// datagram's source port, lands on the receive loop. In degraded mode a
    /// throwaway ephemeral socket is used; the send still works but the reply
    /// is lost.
    pub fn send(&self, msg: &OscMessage) -> Result<()> {
        let bytes = protocol::encode(msg);
        match &self.socket {
            Some(socket) => {
                socket.send_to(&bytes, self.peer)?;
            }
            None => {
                let fallback = UdpSocket::bind(("0.0.0.0", 0))?;
                fallback.send_to(&bytes, self.peer)?;
            }
        }
        tracing::trace!("sent {} ({} args)", msg.address, msg.args.len());
        Ok(())
    }

    /// Stop the receive loop and join the listener thread (best-effort)
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.listener.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Receive loop: decode datagrams and upsert the response cache.
///
/// Timeouts and socket errors are non-fatal; the loop re-checks the shutdown
/// flag once per receive-timeout interval, bounding shutdown latency.
fn receive_loop(socket: Arc<UdpSocket>, cache: Arc<ResponseCache>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while running.load(Ordering::Acquire) {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _addr)) => len,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                tracing::debug!("listener receive error: {e}");
                continue;
            }
        };

        let msg = protocol::decode(&buf[..len]);
        tracing::trace!("received {} ({} args)", msg.address, msg.args.len());
        cache.insert(msg.address, msg.args);
    }
}
