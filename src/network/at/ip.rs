//! Dotted-quad IPv4 text to and from the packed `u32` form.
//!
//! The packed form keeps the first octet in the most significant byte, so
//! `192.168.4.1` is `0xC0A8_0401`. This is the form every address-taking
//! operation of the driver accepts.

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use heapless::String;

use crate::network::error::Error;

/// Longest dotted-quad text, `255.255.255.255`, plus one spare byte.
pub const IPV4_TEXT_MAX: usize = 16;

/// Parse strict dotted-quad text into the packed form.
///
/// ```rust
/// use libesp8266::network::at::ip;
///
/// assert_eq!(ip::parse("192.168.4.1"), Ok(0xC0A8_0401));
/// assert!(ip::parse("192.168.4").is_err());
/// ```
pub fn parse(text: &str) -> Result<u32, Error> {
    text.trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| Error::InvalidAddress)
}

/// Format the packed form as dotted-quad text.
pub fn format(ip: u32) -> String<IPV4_TEXT_MAX> {
    let mut text = String::new();
    // 15 characters at most, always fits.
    let _ = write!(text, "{}", Ipv4Addr::from(ip));
    text
}

/// Pull the first address out of free-form modem output, such as the
/// capture of `AT+CIFSR` (`192.168.4.1\n` or `+CIFSR:STAIP,"10.0.0.7"\n`).
pub fn extract(output: &[u8]) -> Result<u32, Error> {
    let mut rest = output;
    while let Some(start) = rest.iter().position(u8::is_ascii_digit) {
        let run = rest[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .count();
        let candidate = &rest[start..start + run];
        if let Some(ip) = core::str::from_utf8(candidate).ok().and_then(|t| parse(t).ok()) {
            return Ok(ip);
        }
        rest = &rest[start + run..];
    }
    Err(Error::InvalidAddress)
}
