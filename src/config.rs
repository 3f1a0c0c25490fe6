//! Configuration for osclink
//!
//! Centralized configuration with sensible defaults.
//!
//! The peer is an AbletonOSC-compatible bridge: requests go to
//! `(host, command_port)` and the peer sends replies to
//! `(host, response_port)`, which must be configured on the peer
//! out-of-band; there is no dynamic port negotiation.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{OscError, Result};

/// Main configuration for an osclink instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Peer Configuration
    // -------------------------------------------------------------------------
    /// Host/IP of the OSC peer (also the local bind address for responses)
    pub host: String,

    /// Port the peer listens on for commands
    pub command_port: u16,

    /// Local port the peer sends responses to
    pub response_port: u16,

    // -------------------------------------------------------------------------
    // Timing Configuration
    // -------------------------------------------------------------------------
    /// Default budget for one request/response round trip (milliseconds)
    pub reply_timeout_ms: u64,

    /// Listener socket receive timeout; bounds shutdown latency (milliseconds)
    pub recv_timeout_ms: u64,

    /// Delay after a SET before reading back, and between calibration
    /// iterations (milliseconds)
    pub settle_ms: u64,

    /// Delay between write/read cycles during a calibration sweep
    /// (milliseconds)
    pub sweep_settle_ms: u64,

    // -------------------------------------------------------------------------
    // Verified Write Configuration
    // -------------------------------------------------------------------------
    /// Default verified-write attempt count
    pub retries: u32,

    /// Initial backoff delay before the first readback (milliseconds)
    pub base_delay_ms: u64,

    /// Backoff cap (milliseconds)
    pub max_delay_ms: u64,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// How long a fetched parameter `[min, max]` range stays valid
    pub range_ttl: Duration,

    /// How long a stored calibration curve counts as fresh
    pub calibration_ttl: Duration,

    /// Path of the JSON calibration store
    pub calibration_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_port: 11000,
            response_port: 11001,
            reply_timeout_ms: 2000,
            recv_timeout_ms: 500,
            settle_ms: 200,
            sweep_settle_ms: 50,
            retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            range_ttl: Duration::from_secs(300),
            calibration_ttl: Duration::from_secs(24 * 60 * 60),
            calibration_path: PathBuf::from("config/calibration.json"),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `OSCLINK_HOST`, `OSCLINK_COMMAND_PORT`,
    /// `OSCLINK_RESPONSE_PORT`, `OSCLINK_REPLY_TIMEOUT_MS`,
    /// `OSCLINK_RETRIES`, `OSCLINK_CALIBRATION_PATH`.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = std::env::var("OSCLINK_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse::<u16>("OSCLINK_COMMAND_PORT")? {
            config.command_port = port;
        }
        if let Some(port) = env_parse::<u16>("OSCLINK_RESPONSE_PORT")? {
            config.response_port = port;
        }
        if let Some(ms) = env_parse::<u64>("OSCLINK_REPLY_TIMEOUT_MS")? {
            config.reply_timeout_ms = ms;
        }
        if let Some(retries) = env_parse::<u32>("OSCLINK_RETRIES")? {
            config.retries = retries;
        }
        if let Ok(path) = std::env::var("OSCLINK_CALIBRATION_PATH") {
            config.calibration_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Default round-trip budget as a `Duration`
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Listener receive timeout as a `Duration`
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// Post-SET settle delay as a `Duration`
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Parse an env var into `T`, distinguishing "unset" from "set but invalid"
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| OscError::Config(format!("{name}: cannot parse {raw:?}"))),
        Err(_) => Ok(None),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the peer host/IP
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the peer's command port
    pub fn command_port(mut self, port: u16) -> Self {
        self.config.command_port = port;
        self
    }

    /// Set the local response port
    pub fn response_port(mut self, port: u16) -> Self {
        self.config.response_port = port;
        self
    }

    /// Set the default round-trip budget (in milliseconds)
    pub fn reply_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reply_timeout_ms = ms;
        self
    }

    /// Set the post-SET settle delay (in milliseconds)
    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    /// Set the sweep write/read settle delay (in milliseconds)
    pub fn sweep_settle_ms(mut self, ms: u64) -> Self {
        self.config.sweep_settle_ms = ms;
        self
    }

    /// Set the default verified-write attempt count
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the initial backoff delay (in milliseconds)
    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.config.base_delay_ms = ms;
        self
    }

    /// Set the backoff cap (in milliseconds)
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.config.max_delay_ms = ms;
        self
    }

    /// Set the parameter-range cache TTL
    pub fn range_ttl(mut self, ttl: Duration) -> Self {
        self.config.range_ttl = ttl;
        self
    }

    /// Set the calibration-curve freshness TTL
    pub fn calibration_ttl(mut self, ttl: Duration) -> Self {
        self.config.calibration_ttl = ttl;
        self
    }

    /// Set the calibration store path
    pub fn calibration_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.calibration_path = path.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
