#![allow(dead_code)]

use libesp8266::network::esp8266::Esp8266;
use libesp8266::network::{Clock, Config, Read, Serial, Write};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One scripted modem reply, released when the driver finishes a command.
#[derive(Debug)]
struct Reply {
    bytes: Vec<u8>,
    overflow: bool,
}

/// Scripted serial link.
///
/// Replies are queued up front and released one per command: a command is
/// finished when the driver flushes its writes. Unsolicited traffic (inbound
/// requests for the server) is injected with [`MockSerial::push_rx`], or
/// with [`MockSerial::arrive_at`] to make it show up at a given clock time.
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: VecDeque<u8>,
    replies: VecDeque<Reply>,
    /// Chunks not yet on the wire, ordered by arrival time.
    scheduled: VecDeque<(u64, Vec<u8>)>,
    now: Rc<Cell<u64>>,
    tx: Vec<u8>,
    pending: bool,
    overflow: bool,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// A link sharing the time line of `clock`, for [`MockSerial::arrive_at`].
    pub fn timed(clock: &MockClock) -> Self {
        Self {
            now: Rc::clone(&clock.now),
            ..Self::default()
        }
    }

    /// Make `bytes` readable once the clock reaches `at_us`. Chunks must be
    /// scheduled in time order; between chunks the link reads as empty.
    pub fn arrive_at(&mut self, at_us: u64, bytes: impl AsRef<[u8]>) -> &mut Self {
        self.scheduled.push_back((at_us, bytes.as_ref().to_vec()));
        self
    }

    fn release_due(&mut self) {
        let now = self.now.get();
        while self.scheduled.front().is_some_and(|(at, _)| *at <= now) {
            if let Some((_, bytes)) = self.scheduled.pop_front() {
                self.rx.extend(bytes);
            }
        }
    }

    /// Queue the reply to the next command.
    pub fn reply(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        self.replies.push_back(Reply {
            bytes: bytes.as_ref().to_vec(),
            overflow: false,
        });
        self
    }

    /// Queue a reply that also raises the overflow flag.
    pub fn reply_with_overflow(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        self.replies.push_back(Reply {
            bytes: bytes.as_ref().to_vec(),
            overflow: true,
        });
        self
    }

    /// Queue `OK` with the echo of `command`.
    pub fn ok(&mut self, command: &str) -> &mut Self {
        self.reply(format!("{command}\r\r\n\r\nOK\r\n"))
    }

    /// Make bytes available immediately.
    pub fn push_rx(&mut self, bytes: impl AsRef<[u8]>) {
        self.rx.extend(bytes.as_ref());
    }

    /// Everything written so far.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    pub fn tx_str(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    /// `true` if `needle` appears in the written bytes.
    pub fn sent(&self, needle: &str) -> bool {
        self.tx_str().contains(needle)
    }

    /// Bytes still waiting to be read.
    pub fn unread(&self) -> usize {
        self.rx.len()
    }

    pub fn replies_left(&self) -> usize {
        self.replies.len()
    }
}

impl Read for MockSerial {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.release_due();
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockSerial {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        self.pending = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if std::mem::take(&mut self.pending) {
            if let Some(reply) = self.replies.pop_front() {
                self.rx.extend(reply.bytes);
                self.overflow |= reply.overflow;
            }
        }
        Ok(())
    }
}

impl Serial for MockSerial {
    fn bytes_available(&mut self) -> usize {
        self.release_due();
        self.rx.len()
    }

    fn take_overflow(&mut self) -> bool {
        std::mem::take(&mut self.overflow)
    }
}

/// Simulated clock: time only moves when the driver waits.
///
/// The time line is shared with any [`MockSerial::timed`] link built from it.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn elapsed_us(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now_us(&mut self) -> u64 {
        self.now.get()
    }

    fn delay_us(&mut self, us: u32) {
        // A zero poll interval must still let deadlines expire.
        self.now.set(self.now.get() + u64::from(us.max(1)));
    }
}

/// A modem over `serial` with default timing and fast retries.
pub fn modem(serial: MockSerial) -> Esp8266<MockSerial, MockClock> {
    let config = Config {
        retry_delay_ms: 1,
        ..Config::default()
    };
    Esp8266::new(serial, MockClock::default(), config)
}

/// Echo the modem produces for `command`.
pub fn echo(command: &str) -> String {
    format!("{command}\r\r\n")
}
