//! Bounded line reads.
//!
//! The modem link is read one byte at a time so that a read never consumes
//! past the terminator it is looking for. Nothing here fails: a short or zero
//! count is the only signal, and callers decide whether it means "timeout" or
//! "nothing more this round".

use crate::network::time::{Clock, Deadline};
use crate::network::Serial;

/// Read from `serial` into `buf` until one of:
///
/// - `buf` is full,
/// - the transport has no byte within its own read bound,
/// - `terminator` was stored,
/// - `single_line` is set and a `\n` was stored.
///
/// Returns the number of bytes stored, terminator included.
pub fn read_until<S: Serial>(
    serial: &mut S,
    terminator: u8,
    buf: &mut [u8],
    single_line: bool,
) -> usize {
    let mut index = 0;
    while index < buf.len() {
        let mut byte = [0u8; 1];
        match serial.read(&mut byte) {
            Ok(1) => {}
            _ => break,
        }
        buf[index] = byte[0];
        index += 1;
        if byte[0] == terminator || (single_line && byte[0] == b'\n') {
            break;
        }
    }
    index
}

/// Poll until at least one byte is buffered or `max_wait_us` has elapsed.
///
/// Returns the number of bytes available, 0 on timeout.
pub fn wait_for_data<S: Serial, C: Clock>(
    serial: &mut S,
    clock: &mut C,
    max_wait_us: u64,
    poll_interval_us: u32,
) -> usize {
    let deadline = Deadline::start(clock, max_wait_us);
    loop {
        let available = serial.bytes_available();
        if available > 0 {
            return available;
        }
        if deadline.expired(clock) {
            return 0;
        }
        clock.delay_us(poll_interval_us);
    }
}

/// Read and drop everything currently buffered. Also clears the overflow flag.
pub fn drain<S: Serial>(serial: &mut S) -> usize {
    let mut dropped = 0;
    let mut scratch = [0u8; 32];
    while serial.bytes_available() > 0 {
        match serial.read(&mut scratch) {
            Ok(0) | Err(_) => break,
            Ok(n) => dropped += n,
        }
    }
    serial.take_overflow();
    dropped
}

/// `true` if `line` starts with `prefix`.
pub(crate) fn starts_with(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len() && &line[..prefix.len()] == prefix
}

/// Parse the leading ASCII decimal digits of `text`, like C's `atol`
/// without the sign handling. Leading spaces are skipped.
pub(crate) fn parse_leading_u32(text: &[u8]) -> Option<u32> {
    let mut digits = text.iter().skip_while(|b| **b == b' ').peekable();
    digits.peek().filter(|b| b.is_ascii_digit())?;
    let mut value: u32 = 0;
    for byte in digits.take_while(|b| b.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u32::from(byte - b'0'))?;
    }
    Some(value)
}
