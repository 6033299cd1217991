//! Command/response session with the modem.
//!
//! One call to [`CommandChannel::execute`] is one complete exchange:
//!
//! 1. drain stray bytes left over from earlier traffic,
//! 2. write the command fragments, draining the echo between fragments,
//!    then the line terminator,
//! 3. poll for reply lines until a status line is seen or the timeout
//!    elapses. The first line is the echo and is dropped; data lines are
//!    optionally copied into a [`ResponseCapture`].
//!
//! ```text
//! → AT+CIFSR\r\n
//! ← AT+CIFSR\r\r\n        echo, discarded
//! ← 192.168.4.1\r\n       response line 1, captured
//! ← OK\r\n                status line, ends the exchange
//! ```

use crate::network::at::line::{self, starts_with};
use crate::network::at::status::Status;
use crate::network::at::LINE_TERMINATOR;
use crate::network::config::Config;
use crate::network::error::Error;
use crate::network::time::{Clock, Deadline};
use crate::network::Serial;
use heapless::Vec;

/// Maximum number of fragments in one [`Command`].
pub const MAX_COMMAND_PARTS: usize = 8;

/// Longest reply line examined at once; longer lines are handled in chunks.
pub const STATUS_LINE_MAX: usize = 64;

/// A command as an ordered list of fragments.
///
/// Fragments are written back to back and the engine appends the line
/// terminator. Building from fragments avoids formatting user data (SSIDs,
/// paths, response bodies) into an intermediate buffer.
///
/// ```rust
/// use libesp8266::network::at::Command;
///
/// let join = Command::new("AT+CWJAP=\"")
///     .part("my-network")
///     .part("\",\"")
///     .part("secret")
///     .part("\"");
/// assert_eq!(join.len(), 30);
/// ```
#[derive(Debug, Clone)]
pub struct Command<'a> {
    parts: Vec<&'a [u8], MAX_COMMAND_PARTS>,
    truncated: bool,
}

impl<'a> Command<'a> {
    /// A command starting with `text`.
    pub fn new(text: &'a str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// A command starting with raw bytes.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        let mut command = Self {
            parts: Vec::new(),
            truncated: false,
        };
        command.push(bytes);
        command
    }

    /// Append a text fragment.
    pub fn part(mut self, text: &'a str) -> Self {
        self.push(text.as_bytes());
        self
    }

    /// Append a raw byte fragment.
    pub fn bytes(mut self, bytes: &'a [u8]) -> Self {
        self.push(bytes);
        self
    }

    fn push(&mut self, bytes: &'a [u8]) {
        if self.parts.push(bytes).is_err() {
            self.truncated = true;
        }
    }

    /// Fragments in transmission order.
    pub fn parts(&self) -> &[&'a [u8]] {
        &self.parts
    }

    /// Total length of the fragments, terminator excluded.
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }

    /// `true` if the command has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller-owned buffer receiving the data lines of a reply.
///
/// At most `capacity - 1` bytes are stored and the byte after the last one
/// stored is always NUL. Excess bytes are dropped without error. A
/// zero-length buffer disables capture.
#[derive(Debug)]
pub struct ResponseCapture<'a> {
    buf: &'a mut [u8],
    len: usize,
    from_line: u8,
}

impl<'a> ResponseCapture<'a> {
    /// Capture from the first line after the echo.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self::from_line(buf, 1)
    }

    /// Capture starting at response line `from_line` (1 = first after echo).
    pub fn from_line(buf: &'a mut [u8], from_line: u8) -> Self {
        buf.fill(0);
        Self {
            buf,
            len: 0,
            from_line,
        }
    }

    /// `false` for a zero-length buffer.
    pub fn is_enabled(&self) -> bool {
        !self.buf.is_empty()
    }

    /// First response line that is stored.
    pub fn first_line(&self) -> u8 {
        self.from_line
    }

    /// Bytes captured so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Captured bytes as text, if valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Number of bytes captured.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn room(&self) -> usize {
        self.buf.len().saturating_sub(1).saturating_sub(self.len)
    }

    /// Store one reply line (without its `\n`). A trailing `\r` is stored as
    /// `\n`. Returns `false` if anything was dropped.
    fn push_line(&mut self, line: &[u8]) -> bool {
        let (body, ends_line) = match line.split_last() {
            Some((b'\r', body)) => (body, true),
            _ => (line, false),
        };
        let take = body.len().min(self.room());
        self.buf[self.len..self.len + take].copy_from_slice(&body[..take]);
        self.len += take;
        let mut complete = take == body.len();
        if ends_line {
            if self.room() > 0 {
                self.buf[self.len] = b'\n';
                self.len += 1;
            } else {
                complete = false;
            }
        }
        complete
    }
}

/// The request/response session with one modem.
///
/// Owns the serial link, the clock and the [`Config`]. Exactly one exchange
/// is in flight at a time; the session drains the receive buffer before each
/// one, which is the only synchronisation the link needs.
#[derive(Debug)]
pub struct CommandChannel<S, C> {
    serial: S,
    clock: C,
    config: Config,
}

impl<S: Serial, C: Clock> CommandChannel<S, C> {
    /// Create a session over `serial`.
    pub fn new(serial: S, clock: C, config: Config) -> Self {
        Self {
            serial,
            clock,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Get the underlying serial link
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Get a mutable reference to the underlying serial link
    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Get a mutable reference to the clock
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Split the session back into its parts.
    pub fn into_parts(self) -> (S, C, Config) {
        (self.serial, self.clock, self.config)
    }

    /// Send `command` and wait for its status, discarding any data lines.
    pub fn send(&mut self, command: &str) -> Result<(), Error> {
        self.execute(&Command::new(command), None)
    }

    /// Send `command` and capture its data lines into `capture`.
    pub fn query(&mut self, command: &str, capture: &mut ResponseCapture<'_>) -> Result<(), Error> {
        self.execute(&Command::new(command), Some(capture))
    }

    /// Run one exchange and reduce it to a result.
    pub fn execute(
        &mut self,
        command: &Command<'_>,
        capture: Option<&mut ResponseCapture<'_>>,
    ) -> Result<(), Error> {
        if command.truncated {
            return Err(Error::Capacity);
        }
        self.transmit(command)?;
        self.await_status(capture).into_result()
    }

    /// Drop everything currently buffered on the receive side.
    pub fn flush_input(&mut self) {
        let dropped = line::drain(&mut self.serial);
        if dropped > 0 {
            trace!("dropped {} stray bytes", dropped);
        }
    }

    /// Bytes buffered on the receive side.
    pub fn bytes_available(&mut self) -> usize {
        self.serial.bytes_available()
    }

    /// Wait up to `max_wait_us` for data. Returns the number of bytes
    /// available, 0 on timeout.
    pub fn wait_for_data(&mut self, max_wait_us: u64) -> usize {
        line::wait_for_data(
            &mut self.serial,
            &mut self.clock,
            max_wait_us,
            self.config.poll_interval_us,
        )
    }

    /// Dump incoming lines until the modem reports `Unlink`.
    ///
    /// Fails with [`Error::UnlinkFailed`] if the link goes quiet first, in
    /// which case the connection state is unknown and a reset is advised.
    pub fn await_unlink(&mut self) -> Result<(), Error> {
        let wait_us = u64::from(self.config.unlink_timeout_ms) * 1_000;
        let mut buf = [0u8; 16];
        let mut line_start = true;
        loop {
            if self.wait_for_data(wait_us) == 0 {
                warn!("no Unlink within {} ms", self.config.unlink_timeout_ms);
                return Err(Error::UnlinkFailed);
            }
            let n = line::read_until(&mut self.serial, b'\n', &mut buf, true);
            if n == 0 {
                continue;
            }
            if line_start && starts_with(&buf[..n], b"Unlink") {
                debug!("connection unlinked");
                return Ok(());
            }
            line_start = buf[n - 1] == b'\n';
        }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut S, &mut C, &Config) {
        (&mut self.serial, &mut self.clock, &self.config)
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        while !bytes.is_empty() {
            match self.serial.write(bytes) {
                Ok(0) | Err(_) => return Err(Error::WriteError),
                Ok(n) => bytes = &bytes[n..],
            }
        }
        Ok(())
    }

    fn transmit(&mut self, command: &Command<'_>) -> Result<(), Error> {
        self.flush_input();
        trace!("send {} bytes in {} parts", command.len(), command.parts().len());
        for (i, part) in command.parts().iter().enumerate() {
            if i > 0 {
                // The modem echoes each byte; drop it before it piles up.
                self.flush_input();
            }
            self.write_all(part)?;
        }
        self.write_all(LINE_TERMINATOR)?;
        self.serial.flush().map_err(|_| Error::WriteError)
    }

    fn await_status(&mut self, mut capture: Option<&mut ResponseCapture<'_>>) -> Status {
        let deadline = Deadline::start(&mut self.clock, self.config.command_timeout_us);
        let mut line_number: u8 = 0;
        let mut buf = [0u8; STATUS_LINE_MAX];
        // Bytes of the current line received so far. Survives polls, so a
        // line that trickles in is only examined once it is complete.
        let mut filled = 0;
        // `buf` holds the start of a line rather than a continuation chunk.
        let mut line_start = true;

        while !deadline.expired(&mut self.clock) {
            if self.serial.take_overflow() {
                warn!("receive overflow");
                self.flush_input();
                return Status::Overflow;
            }

            if self.serial.bytes_available() > 0 {
                filled += line::read_until(&mut self.serial, b'\n', &mut buf[filled..STATUS_LINE_MAX - 1], false);
            }

            let complete = filled > 0 && buf[filled - 1] == b'\n';
            let full = filled == STATUS_LINE_MAX - 1;
            // The data prompt is "> " and never gets a newline.
            let prompt = line_number > 0 && line_start && filled > 0 && buf[0] == b'>';

            if complete || full || prompt {
                let text = match buf[..filled].split_last() {
                    Some((b'\n', rest)) => rest,
                    _ => &buf[..filled],
                };
                let ends_with_cr = text.last() == Some(&b'\r');

                if line_number == 0 {
                    // Echo of the command; it ends at the CR we sent.
                    if ends_with_cr {
                        line_number = 1;
                    }
                } else {
                    if line_start {
                        if let Some(status) = Status::classify(text) {
                            debug!("status {}", status);
                            return status;
                        }
                    }
                    if let Some(capture) = capture.as_deref_mut() {
                        if capture.is_enabled()
                            && capture.first_line() <= line_number
                            && !capture.push_line(text)
                        {
                            trace!("capture full, dropping");
                        }
                    }
                    if ends_with_cr {
                        line_number = line_number.saturating_add(1);
                    }
                }
                line_start = complete;
                filled = 0;
                continue;
            }

            self.clock.delay_us(self.config.poll_interval_us);
        }

        warn!("timed out after {} us", deadline.bound_us());
        Status::Timeout
    }
}
