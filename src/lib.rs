//! # libesp8266 - ESP8266 AT-command driver
//!
//! A Rust driver that turns a byte-oriented serial link to an ESP8266 Wi-Fi
//! modem into a usable TCP/HTTP client and server. The modem runs the TCP/IP
//! stack; this crate speaks its line-based AT command dialect and
//! demultiplexes the asynchronous `+IPD` data notifications it emits.
//!
//! The library is designed for embedded systems and supports `no_std`
//! environments without a heap: every buffer is caller-owned and fixed size.
//!
//! ## Features
//!
//! ### Protocol engine
//! - **Command session**: send a command, classify the modem's reply into a
//!   [`Status`](network::at::Status), optionally capture response lines
//! - **Packet demultiplexer**: reassemble `+IPD` packets into one logical
//!   response, filter by mux channel, optional HTTP framing overlay
//!
//! ### Device and application layer
//! - **Device facade**: reset, firmware version, Wi-Fi join/quit, AP scan, IP query
//! - **HTTP client**: HTTP/1.0 `GET` with header stripping and status code
//! - **HTTP server**: prefix-routed request dispatch over the modem's mux mode
//!
//! ## Usage
//!
//! ```rust,no_run
//! use libesp8266::network::{Clock, Config, Read, Serial, Write};
//! use libesp8266::network::application::http::LineSelector;
//! use libesp8266::network::esp8266::Esp8266;
//! # struct Uart;
//! # impl Read for Uart {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Uart {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Serial for Uart {
//! #     fn bytes_available(&mut self) -> usize { 0 }
//! # }
//! # struct Ticks(u64);
//! # impl Clock for Ticks {
//! #     fn now_us(&mut self) -> u64 { self.0 }
//! #     fn delay_us(&mut self, us: u32) { self.0 += us as u64 }
//! # }
//!
//! let mut modem = Esp8266::new(Uart, Ticks(0), Config::default());
//! let ip = modem.setup_as_station("my-network", "secret")?;
//!
//! let mut body = [0u8; 256];
//! let response = modem.http_client().get_str(
//!     "93.184.216.34",
//!     80,
//!     "/",
//!     Some("example.com"),
//!     LineSelector::BODY,
//!     &mut body,
//! )?;
//! # let _ = (ip, response);
//! # Ok::<(), libesp8266::network::error::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (adds `StdClock`)
//! - `defmt`: Enable defmt logging and `defmt::Format` for error types

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Serial transport traits, timing, configuration and the AT protocol stack.
///
/// This module contains the byte-stream abstraction the driver runs on, the
/// AT command engine, the device facade and the HTTP shims built on top.
pub mod network;
