//! Serial-facing abstraction layer for the ESP8266 driver
//!
//! This module provides the small set of traits the driver needs from the
//! platform: a byte stream to the modem ([`Read`], [`Write`], [`Serial`]) and
//! a monotonic time source ([`Clock`]). Everything above (the AT engine, the
//! device facade and the HTTP shims) is written against these traits only.
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for modem operations
pub mod error;

/// Runtime configuration (timeouts, retry policy)
pub mod config;

/// Monotonic time source and deadlines
pub mod time;

/// The AT protocol engine: line reader, command session, `+IPD` demultiplexer
pub mod at;

/// High-level device operations
pub mod esp8266;

/// Application protocols layered on the engine
pub mod application;

pub use config::Config;
pub use time::{Clock, Deadline};

#[cfg(feature = "std")]
pub use time::StdClock;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Clock, Read, Serial, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the link, waiting at most a short transport-defined
    /// bound. `Ok(0)` means no data arrived in that window.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the link
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A serial link to the modem.
///
/// On top of plain reads and writes the engine needs to know how much is
/// buffered on the receive side, and (best effort) whether the receive buffer
/// overflowed since the last check.
pub trait Serial: Read + Write {
    /// Number of bytes that can be read without waiting
    fn bytes_available(&mut self) -> usize;

    /// Returns `true` once if bytes were dropped on receive since the last
    /// call. Transports that cannot detect this keep the default.
    fn take_overflow(&mut self) -> bool {
        false
    }
}
