//! Shared test harness: a scripted in-process UDP peer.
//!
//! The peer binds an ephemeral port and answers each decoded request
//! through a handler closure, replying to the datagram's source address,
//! exactly how the real workstation bridge addresses its responses.

#![allow(dead_code)]

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use osclink::protocol::{decode, encode, OscArg, OscMessage};
use osclink::Config;

/// Scripted UDP peer for end-to-end tests
pub struct MockPeer {
    port: u16,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockPeer {
    /// Spawn a peer whose handler maps each request to zero or more replies
    pub fn spawn<F>(mut handler: F) -> Self
    where
        F: FnMut(&OscMessage) -> Vec<OscMessage> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind mock peer");
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("set peer read timeout");
        let port = socket.local_addr().expect("peer local addr").port();

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 65536];
            while thread_running.load(Ordering::Acquire) {
                let (len, src) = match socket.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(_) => continue,
                };
                let request = decode(&buf[..len]);
                for reply in handler(&request) {
                    socket
                        .send_to(&encode(&reply), src)
                        .expect("mock peer reply");
                }
            }
        });

        Self {
            port,
            running,
            handle: Some(handle),
        }
    }

    /// Port the peer listens on; becomes the controller's command port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// A config pointed at this peer, with test-friendly timings.
    ///
    /// `response_port: 0` lets the OS pick a free listener port; the peer
    /// replies to the datagram's source address, so no fixed port is needed.
    /// The calibration store path is unique per peer so parallel tests do
    /// not share learned curves.
    pub fn config(&self) -> Config {
        Config::builder()
            .host("127.0.0.1")
            .command_port(self.port)
            .response_port(0)
            .reply_timeout_ms(500)
            .settle_ms(10)
            .sweep_settle_ms(5)
            .base_delay_ms(10)
            .max_delay_ms(50)
            .calibration_path(
                std::env::temp_dir().join(format!("osclink-test-{}.json", self.port)),
            )
            .build()
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Peer that echoes device-parameter state: answers value, display-string,
/// and range queries from a `display(normalized) -> String` mapping.
pub fn parameter_peer<D>(
    mins: Vec<f32>,
    maxs: Vec<f32>,
    display: D,
) -> MockPeer
where
    D: Fn(f32) -> String + Send + 'static,
{
    let mut current: f32 = 0.0;
    MockPeer::spawn(move |request| {
        let ids = || {
            request
                .args
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<OscArg>>()
        };
        match request.address.as_str() {
            "/live/device/set/parameter/value" => {
                if let Some(OscArg::Float(v)) = request.args.last() {
                    current = *v;
                }
                vec![]
            }
            "/live/device/get/parameter/value" => {
                let mut args = ids();
                args.push(OscArg::Float(current));
                vec![OscMessage::new(request.address.clone(), args)]
            }
            "/live/device/get/parameter/value_string" => {
                let mut args = ids();
                args.push(OscArg::Str(display(current)));
                vec![OscMessage::new(request.address.clone(), args)]
            }
            "/live/device/get/parameters/min" => {
                let mut args: Vec<OscArg> =
                    request.args.iter().take(2).cloned().collect();
                args.extend(mins.iter().map(|&v| OscArg::Float(v)));
                vec![OscMessage::new(request.address.clone(), args)]
            }
            "/live/device/get/parameters/max" => {
                let mut args: Vec<OscArg> =
                    request.args.iter().take(2).cloned().collect();
                args.extend(maxs.iter().map(|&v| OscArg::Float(v)));
                vec![OscMessage::new(request.address.clone(), args)]
            }
            _ => vec![],
        }
    })
}
