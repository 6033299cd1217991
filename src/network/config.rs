//! Driver configuration.
//!
//! All timing in the driver is bounded by the values in [`Config`]. The
//! defaults suit a 9600-115200 bps link to a stock ESP8266 AT firmware.
//! A configuration can also be loaded from a small JSON document, which is
//! handy when the values live in flash next to the Wi-Fi credentials:
//!
//! ```rust
//! use libesp8266::network::Config;
//!
//! let config = Config::from_json(r#"{"command_timeout_us":5000000}"#).unwrap();
//! assert_eq!(config.command_timeout_us, 5_000_000);
//! assert_eq!(config.poll_interval_us, 100);
//! ```

use crate::network::error::Error;
use serde::{Deserialize, Serialize};

/// Longest command timeout the modem accepts through `set_timeout`, in seconds.
pub const MAX_TIMEOUT_SECS: u32 = 28_800;

/// Timing and retry settings shared by every operation on one modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a command may wait for a status line, and how long a packet
    /// stream may stall between packets.
    pub command_timeout_us: u64,
    /// Delay between polls of the receive buffer.
    pub poll_interval_us: u32,
    /// How long a server poll waits for an inbound request.
    pub data_wait_ms: u32,
    /// How long to wait for `Unlink` after a response has been read.
    pub unlink_timeout_ms: u32,
    /// Minimum command timeout while joining an access point.
    pub join_timeout_us: u64,
    /// Attempts made by retrying operations (reset, station setup).
    pub retry_attempts: u8,
    /// Pause between those attempts.
    pub retry_delay_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_us: 2_000_000,
            poll_interval_us: 100,
            data_wait_ms: 1_000,
            unlink_timeout_ms: 1_000,
            join_timeout_us: 5_000_000,
            retry_attempts: 5,
            retry_delay_ms: 1_000,
        }
    }
}

impl Config {
    /// Parse a JSON document. Missing fields keep their default value.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json_core::from_str::<Config>(json)
            .map(|(config, _)| config)
            .map_err(|_| Error::InvalidConfig)
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn to_json(&self, buf: &mut [u8]) -> Result<usize, Error> {
        serde_json_core::to_slice(self, buf).map_err(|_| Error::Capacity)
    }

    /// Returns a copy with the command timeout set to `seconds`, clamped to
    /// [`MAX_TIMEOUT_SECS`].
    pub fn with_timeout_secs(mut self, seconds: u32) -> Self {
        self.command_timeout_us = u64::from(seconds.min(MAX_TIMEOUT_SECS)) * 1_000_000;
        self
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Config {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Config {{ command_timeout_us: {}, poll_interval_us: {}, retry_attempts: {} }}",
            self.command_timeout_us,
            self.poll_interval_us,
            self.retry_attempts
        )
    }
}
