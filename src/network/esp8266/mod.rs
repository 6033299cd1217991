//! ESP8266 device facade.
//!
//! [`Esp8266`] wraps a [`CommandChannel`] and turns the AT vocabulary into
//! typed operations: reset, Wi-Fi association, address queries and the
//! entry points of the HTTP client and server.
//!
//! ```rust,ignore
//! let mut modem = Esp8266::new(uart, clock, Config::default());
//! modem.reset()?;
//! modem.join_access_point("my-network", "secret")?;
//! let ip = modem.ip_address_string()?;
//! ```

use core::fmt::Write as _;

use heapless::String;

use crate::network::application::http::{HttpClient, HttpServer};
use crate::network::at::{ip, line, Command, CommandChannel, ResponseCapture};
use crate::network::config::{Config, MAX_TIMEOUT_SECS};
use crate::network::error::Error;
use crate::network::time::Clock;
use crate::network::Serial;

/// Capture size for `AT+GMR`: ten characters are parsed.
const FIRMWARE_CAPTURE: usize = 11;

/// Capture size for `AT+CIFSR`, large enough for the labelled form
/// (`+CIFSR:STAIP,"255.255.255.255"`).
const ADDRESS_CAPTURE: usize = 48;

/// Radio role selected with `AT+CWMODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Join an existing access point.
    Station = 1,
    /// Act as an access point.
    AccessPoint = 2,
    /// Both at once.
    Both = 3,
}

impl WifiMode {
    fn command(self) -> &'static str {
        match self {
            WifiMode::Station => "AT+CWMODE=1",
            WifiMode::AccessPoint => "AT+CWMODE=2",
            WifiMode::Both => "AT+CWMODE=3",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for WifiMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            WifiMode::Station => defmt::write!(f, "Station"),
            WifiMode::AccessPoint => defmt::write!(f, "AccessPoint"),
            WifiMode::Both => defmt::write!(f, "Both"),
        }
    }
}

/// One ESP8266 modem on a serial link.
#[derive(Debug)]
pub struct Esp8266<S, C> {
    channel: CommandChannel<S, C>,
}

impl<S: Serial, C: Clock> Esp8266<S, C> {
    /// Wrap a serial link. Nothing is sent until the first operation.
    pub fn new(serial: S, clock: C, config: Config) -> Self {
        Self {
            channel: CommandChannel::new(serial, clock, config),
        }
    }

    /// The underlying command session.
    pub fn channel(&self) -> &CommandChannel<S, C> {
        &self.channel
    }

    /// Mutable access to the command session, for raw AT commands.
    pub fn channel_mut(&mut self) -> &mut CommandChannel<S, C> {
        &mut self.channel
    }

    /// Give back the serial link, the clock and the configuration.
    pub fn release(self) -> (S, C, Config) {
        self.channel.into_parts()
    }

    /// Soft-reset the modem and wait until it answers `AT` again.
    ///
    /// Each phase gets `retry_attempts` tries `retry_delay_ms` apart; running
    /// out of tries yields [`Error::Device`].
    pub fn reset(&mut self) -> Result<(), Error> {
        self.retry("AT+RST")?;
        self.retry("AT")?;
        info!("modem reset");
        Ok(())
    }

    fn retry(&mut self, command: &str) -> Result<(), Error> {
        let attempts = self.channel.config().retry_attempts.max(1);
        let delay = self.channel.config().retry_delay_ms;
        for attempt in 1..=attempts {
            match self.channel.send(command) {
                Ok(()) => return Ok(()),
                Err(_e) if attempt < attempts => {
                    debug!("attempt {} failed: {}", attempt, _e);
                    self.channel.clock_mut().delay_ms(delay);
                }
                Err(_) => break,
            }
        }
        warn!("gave up after {} attempts", attempts);
        Err(Error::Device)
    }

    /// Firmware version reported by `AT+GMR`, as its leading number.
    ///
    /// Old firmware prints a bare number such as `00160901`; anything
    /// without leading digits reads as 0.
    pub fn firmware_version(&mut self) -> Result<u32, Error> {
        let mut buf = [0u8; FIRMWARE_CAPTURE];
        let mut capture = ResponseCapture::new(&mut buf);
        self.channel.query("AT+GMR", &mut capture)?;
        Ok(line::parse_leading_u32(capture.as_bytes()).unwrap_or(0))
    }

    /// Select station, access point or combined mode.
    pub fn set_wifi_mode(&mut self, mode: WifiMode) -> Result<(), Error> {
        debug!("wifi mode {}", mode);
        self.channel.send(mode.command())
    }

    /// Switch to station mode and join `ssid`.
    ///
    /// Association is slow, so the command timeout is raised to at least
    /// `join_timeout_us` for this exchange and restored afterwards.
    pub fn join_access_point(&mut self, ssid: &str, password: &str) -> Result<(), Error> {
        self.set_wifi_mode(WifiMode::Station)?;

        let previous = self.channel.config().command_timeout_us;
        let join = self.channel.config().join_timeout_us;
        self.channel.config_mut().command_timeout_us = previous.max(join);

        let command = Command::new("AT+CWJAP=\"")
            .part(ssid)
            .part("\",\"")
            .part(password)
            .part("\"");
        let result = self.channel.execute(&command, None);

        self.channel.config_mut().command_timeout_us = previous;
        if result.is_ok() {
            info!("joined access point");
        }
        result
    }

    /// Leave the current access point.
    pub fn quit_access_point(&mut self) -> Result<(), Error> {
        self.channel.send("AT+CWQAP")
    }

    /// Capture the `AT+CWLAP` listing into `buf`. Returns the bytes stored.
    pub fn list_access_points(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut capture = ResponseCapture::new(buf);
        self.channel.query("AT+CWLAP", &mut capture)?;
        Ok(capture.len())
    }

    /// Station address in packed form, from `AT+CIFSR`.
    pub fn ip_address(&mut self) -> Result<u32, Error> {
        let mut buf = [0u8; ADDRESS_CAPTURE];
        let mut capture = ResponseCapture::new(&mut buf);
        self.channel.query("AT+CIFSR", &mut capture)?;
        ip::extract(capture.as_bytes())
    }

    /// Station address as dotted-quad text.
    pub fn ip_address_string(&mut self) -> Result<String<{ ip::IPV4_TEXT_MAX }>, Error> {
        self.ip_address().map(ip::format)
    }

    /// Set the local command timeout, clamped to [`MAX_TIMEOUT_SECS`].
    pub fn set_command_timeout_secs(&mut self, seconds: u32) {
        let config = self.channel.config_mut();
        *config = config.with_timeout_secs(seconds);
    }

    /// Set the modem's server-side idle timeout with `AT+CIPSTO`.
    pub fn set_server_timeout(&mut self, seconds: u32) -> Result<(), Error> {
        let mut command: String<24> = String::new();
        write!(command, "AT+CIPSTO={}", seconds.min(MAX_TIMEOUT_SECS)).map_err(|_| Error::Capacity)?;
        self.channel.send(&command)
    }

    /// Capture the `AT+CIPSTATUS` report into `buf`. Returns the bytes stored.
    pub fn connection_status(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut capture = ResponseCapture::new(buf);
        self.channel.query("AT+CIPSTATUS", &mut capture)?;
        Ok(capture.len())
    }

    /// Reset, join `ssid` and fetch the address, retrying each step up to
    /// `retry_attempts` times. Returns the station address.
    pub fn setup_as_station(&mut self, ssid: &str, password: &str) -> Result<u32, Error> {
        let attempts = self.channel.config().retry_attempts.max(1);
        let delay = self.channel.config().retry_delay_ms;

        self.settle(attempts, delay, |modem| modem.reset())?;
        self.settle(attempts, delay, |modem| modem.join_access_point(ssid, password))?;
        self.settle(attempts, delay, |modem| modem.ip_address())
    }

    /// Run `step` up to `attempts` times, `delay` ms apart.
    fn settle<T, F>(&mut self, attempts: u8, delay: u32, mut step: F) -> Result<T, Error>
    where
        F: FnMut(&mut Self) -> Result<T, Error>,
    {
        let mut last = Error::Device;
        for attempt in 1..=attempts {
            match step(self) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("setup step failed ({}/{}): {}", attempt, attempts, e);
                    last = e;
                }
            }
            if attempt < attempts {
                self.channel.clock_mut().delay_ms(delay);
            }
        }
        Err(last)
    }

    /// An HTTP GET client borrowing this modem.
    pub fn http_client(&mut self) -> HttpClient<'_, S, C> {
        HttpClient::new(self)
    }

    /// An HTTP server on `port` borrowing this modem, with `N`-byte request
    /// and response buffers. Call [`HttpServer::start`] before polling.
    pub fn http_server<const N: usize>(&mut self, port: u16) -> HttpServer<'_, S, C, N> {
        HttpServer::new(self, port)
    }
}
