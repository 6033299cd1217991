//! `+IPD` packet demultiplexer.
//!
//! Once a socket is open the modem forwards inbound TCP data as
//! notifications of the form
//!
//! ```text
//! +IPD,<length>:<length raw bytes>             single connection
//! +IPD,<channel>,<length>:<length raw bytes>   multiplexed (AT+CIPMUX=1)
//! ```
//!
//! interleaved with `OK` lines, blank lines and finally `Unlink` when the
//! peer closes. [`IpdReader`] turns that into one contiguous buffer:
//!
//! - consecutive packets are concatenated into the same logical response,
//! - an optional channel filter drops packets for other connections,
//! - an optional HTTP overlay parses the status line and keeps or drops
//!   lines according to a [`LineSelector`].
//!
//! The reader alternates between two states per call:
//!
//! ```text
//!            +IPD header parsed
//!  SEEKING ──────────────────────▶ DRAINING
//!     ▲                               │
//!     └──────── packet exhausted ─────┘
//!
//!  stops on: buffer full, "Unlink", idle timeout
//! ```

use crate::network::at::command::CommandChannel;
use crate::network::at::line::{self, parse_leading_u32, starts_with};
use crate::network::error::Error;
use crate::network::time::{Clock, Deadline};
use crate::network::Serial;
use heapless::Vec;

/// Longest `+IPD,<channel>,<length>:` header accepted.
pub const IPD_HEADER_MAX: usize = 32;

/// Offset of the status code in `HTTP/1.1 200 OK`.
const HTTP_STATUS_OFFSET: usize = 9;

/// Status line bytes kept for parsing: version, space and the code.
const STATUS_LINE_KEEP: usize = 16;

const HTTP_PREFIX: &[u8] = b"HTTP/";

/// One parsed `+IPD` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Mux channel, absent in single-connection mode.
    pub channel: Option<u8>,
    /// Payload bytes that follow the `:`.
    pub len: usize,
}

impl Packet {
    /// Parse `+IPD[,channel],length:`. Leading noise before `+IPD` is
    /// ignored; the text must end with the `:`.
    pub fn parse(header: &[u8]) -> Option<Packet> {
        let (&b':', head) = header.split_last()? else {
            return None;
        };
        let start = head.windows(5).position(|w| w == b"+IPD,")?;
        let fields = &head[start + 5..];

        let mut parts = fields.split(|b| *b == b',');
        let first = parse_decimal(parts.next()?)?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(Packet {
                channel: None,
                len: first as usize,
            }),
            (Some(len), None) => Some(Packet {
                channel: Some(u8::try_from(first).ok()?),
                len: parse_decimal(len)? as usize,
            }),
            _ => None,
        }
    }
}

fn parse_decimal(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    parse_leading_u32(field)
}

/// Which lines of an HTTP response to keep.
///
/// - `0`: everything, headers included
/// - `N > 0`: body only, starting at body line `N`
/// - `N < 0`: headers only, starting at header line `|N|`; the body is
///   never read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSelector(pub i16);

impl LineSelector {
    /// Keep the whole response.
    pub const ALL: LineSelector = LineSelector(0);
    /// Keep the whole body, drop the headers.
    pub const BODY: LineSelector = LineSelector(1);
    /// Keep the whole header block, drop the body.
    pub const HEADERS: LineSelector = LineSelector(-1);

    /// Body only, from body line `line` (1-based).
    pub const fn body_from(line: i16) -> Self {
        LineSelector(line.saturating_abs())
    }

    /// Headers only, from header line `line` (1-based; line 1 is the status line).
    pub const fn headers_from(line: i16) -> Self {
        LineSelector(-line.saturating_abs())
    }

    fn first_line(self) -> u32 {
        u32::from(self.0.unsigned_abs())
    }
}

impl Default for LineSelector {
    fn default() -> Self {
        LineSelector::BODY
    }
}

impl From<i16> for LineSelector {
    fn from(value: i16) -> Self {
        LineSelector(value)
    }
}

/// Outcome of one [`IpdReader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Received {
    /// Bytes stored in the caller's buffer (a NUL follows them).
    pub len: usize,
    /// Channel the read was bound to, if any.
    pub channel: Option<u8>,
    /// HTTP status code, if an `HTTP/` status line was seen.
    pub status: Option<u16>,
    /// `true` if the stream ended with `Unlink`.
    pub unlinked: bool,
    /// Number of `+IPD` headers seen, discarded ones included.
    pub packets: u16,
}

/// Reads one logical response out of the `+IPD` notification stream.
///
/// ```rust,ignore
/// let mut body = [0u8; 128];
/// let received = IpdReader::new(&mut session)
///     .http(LineSelector::BODY)
///     .read(&mut body)?;
/// assert_eq!(received.status, Some(200));
/// ```
#[derive(Debug)]
pub struct IpdReader<'c, S, C> {
    session: &'c mut CommandChannel<S, C>,
    channel: Option<u8>,
    selector: Option<LineSelector>,
    parse_status: bool,
}

impl<'c, S: Serial, C: Clock> IpdReader<'c, S, C> {
    /// A reader accepting any channel, without HTTP handling.
    pub fn new(session: &'c mut CommandChannel<S, C>) -> Self {
        Self {
            session,
            channel: None,
            selector: None,
            parse_status: false,
        }
    }

    /// Only accept packets for `channel`; others are discarded.
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Keep or skip lines per `selector`, without HTTP status parsing.
    pub fn lines(mut self, selector: LineSelector) -> Self {
        self.selector = Some(selector);
        self.parse_status = false;
        self
    }

    /// Parse the HTTP status line and apply `selector` to the response.
    pub fn http(mut self, selector: LineSelector) -> Self {
        self.selector = Some(selector);
        self.parse_status = true;
        self
    }

    /// Collect one response into `buf`.
    ///
    /// At most `buf.len() - 1` bytes are stored and the buffer is
    /// NUL-terminated. Fails with [`Error::Timeout`] only if no `+IPD` header
    /// arrived at all; a stream that stalls part way returns what it has.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Received, Error> {
        buf.fill(0);
        let capacity = buf.len().saturating_sub(1);
        let mut received = Received {
            channel: self.channel,
            ..Received::default()
        };
        if capacity == 0 {
            return Ok(received);
        }

        let (serial, clock, config) = self.session.parts_mut();
        let poll = config.poll_interval_us;
        let mut idle = Deadline::start(clock, config.command_timeout_us);
        let mut framing = HttpFraming::new(self.selector, self.parse_status);
        let mut header = [0u8; IPD_HEADER_MAX];
        // Header bytes received so far; a header may arrive over several polls.
        let mut header_len = 0;
        let mut remaining: Option<usize> = None;
        let mut index = 0;

        loop {
            if idle.expired(clock) {
                if received.packets == 0 {
                    warn!("no +IPD within {} us", idle.bound_us());
                    return Err(Error::Timeout);
                }
                warn!("packet stream stalled after {} bytes", index);
                break;
            }

            let Some(left) = remaining else {
                // SEEKING: look for the next header.
                if serial.bytes_available() == 0 {
                    clock.delay_us(poll);
                    continue;
                }
                header_len += line::read_until(serial, b':', &mut header[header_len..], true);
                let complete = matches!(header[..header_len].last(), Some(b':' | b'\n'));
                if !complete && header_len < header.len() {
                    continue;
                }
                let text = trim_start(&header[..header_len]);
                header_len = 0;
                if let Some(packet) = Packet::parse(text) {
                    idle.restart(clock);
                    received.packets = received.packets.saturating_add(1);
                    trace!("+IPD channel={} len={}", packet.channel, packet.len);
                    match (received.channel, packet.channel) {
                        (Some(want), Some(got)) if want != got => {
                            debug!("dropping {} bytes for channel {}", packet.len, got);
                            discard(serial, clock, packet.len, idle.bound_us(), poll);
                            idle.restart(clock);
                            continue;
                        }
                        (None, Some(got)) => received.channel = Some(got),
                        _ => {}
                    }
                    remaining = Some(packet.len);
                } else if starts_with(text, b"Unlink") {
                    debug!("stream unlinked");
                    received.unlinked = true;
                    break;
                }
                // Anything else ("OK", blank lines) is noise between packets.
                continue;
            };

            // DRAINING: copy payload into the caller's buffer.
            if left == 0 || index >= capacity {
                break;
            }
            let want = left.min(capacity - index);
            let n = line::read_until(serial, b'\n', &mut buf[index..index + want], false);
            if n == 0 {
                clock.delay_us(poll);
                continue;
            }
            idle.restart(clock);
            let start = index;
            index += n;
            let left = left - n;
            remaining = Some(left);

            let (kept, stop) = framing.apply(buf, start, index);
            index = kept;
            if stop {
                break;
            }
            if left == 0 {
                if index >= capacity {
                    break;
                }
                remaining = None;
            } else if index >= capacity {
                break;
            }
        }

        framing.finish();
        received.len = index;
        received.status = framing.status;
        Ok(received)
    }
}

fn trim_start(text: &[u8]) -> &[u8] {
    let skip = text.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &text[skip..]
}

fn discard<S: Serial, C: Clock>(serial: &mut S, clock: &mut C, mut left: usize, bound_us: u64, poll: u32) {
    let mut deadline = Deadline::start(clock, bound_us);
    let mut scratch = [0u8; 32];
    while left > 0 && !deadline.expired(clock) {
        let want = left.min(scratch.len());
        match serial.read(&mut scratch[..want]) {
            Ok(n) if n > 0 => {
                left -= n;
                deadline.restart(clock);
            }
            _ => clock.delay_us(poll),
        }
    }
}

/// Per-read HTTP line bookkeeping. Lives for one [`IpdReader::read`] only.
#[derive(Debug)]
struct HttpFraming {
    selector: Option<LineSelector>,
    parse_status: bool,
    /// 1-based number of the line being received.
    line: u32,
    /// The first line has been seen far enough to tell whether it is a
    /// status line. Until then its bytes are held at the front of the buffer.
    opened: bool,
    /// An `HTTP/` status line opened the response.
    framed: bool,
    headers_ended: bool,
    /// The current line holds something other than CR.
    line_has_content: bool,
    /// Leading bytes of the status line, kept until the line is complete.
    status_line: Vec<u8, STATUS_LINE_KEEP>,
    status: Option<u16>,
}

impl HttpFraming {
    fn new(selector: Option<LineSelector>, parse_status: bool) -> Self {
        Self {
            selector,
            parse_status,
            line: 1,
            opened: false,
            framed: false,
            headers_ended: false,
            line_has_content: false,
            status_line: Vec::new(),
            status: None,
        }
    }

    /// Apply the selector to the fragment `buf[start..end]` just appended.
    /// Returns the new write index and whether reading should stop.
    fn apply(&mut self, buf: &mut [u8], mut start: usize, end: usize) -> (usize, bool) {
        let Some(selector) = self.selector else {
            return (end, false);
        };

        if !self.opened {
            // Nothing has been dropped yet, so the first line starts at buf[0].
            let head = &buf[..end];
            let undecided = self.parse_status
                && head.len() < HTTP_PREFIX.len()
                && head.last() != Some(&b'\n')
                && HTTP_PREFIX.starts_with(head);
            if undecided {
                return (end, false);
            }
            self.opened = true;
            self.framed = self.parse_status && starts_with(head, HTTP_PREFIX);
            start = 0;
        }

        let fragment = &buf[start..end];
        let ends_line = fragment.last() == Some(&b'\n');
        self.line_has_content |= fragment.iter().any(|b| *b != b'\r' && *b != b'\n');
        let blank_line = ends_line && !self.line_has_content;
        if ends_line {
            self.line_has_content = false;
        }

        if self.framed && self.line == 1 {
            let room = STATUS_LINE_KEEP - self.status_line.len();
            let _ = self.status_line.extend_from_slice(&fragment[..fragment.len().min(room)]);
            if ends_line {
                self.parse_status_line();
            }
        }

        if self.framed && selector.0 > 0 && !self.headers_ended {
            if blank_line && self.line > 1 {
                trace!("headers ended after {} lines", self.line);
                self.headers_ended = true;
                self.line = 1;
            } else if ends_line {
                self.line += 1;
            }
            buf[..end].fill(0);
            return (0, false);
        }

        if selector.first_line() > self.line {
            if ends_line {
                self.line += 1;
            }
            buf[..end].fill(0);
            return (0, false);
        }

        let stop = self.framed && selector.0 < 0 && blank_line;
        if ends_line {
            self.line += 1;
        }
        (end, stop)
    }

    /// Settle the status code of a response that ended inside its status line.
    fn finish(&mut self) {
        if self.framed && self.status.is_none() {
            self.parse_status_line();
        }
    }

    fn parse_status_line(&mut self) {
        self.status = self
            .status_line
            .get(HTTP_STATUS_OFFSET..)
            .and_then(parse_leading_u32)
            .and_then(|code| u16::try_from(code).ok());
        debug!("HTTP status {}", self.status);
    }
}
