//! HTTP over the modem's TCP sockets.
//!
//! This module provides the two HTTP shims of the driver. Both are thin
//! consumers of the AT engine and use fixed caller-owned buffers only.
//!
//! # Features
//!
//! - GET requests, HTTP/1.0 when a host is given (never chunked)
//! - Status code extraction and line-based header or body selection
//! - A first-match-wins prefix router with a built-in 404
//! - Per-channel replies in multiplexed server mode
//!
//! # Usage
//!
//! ```rust,no_run
//! # use libesp8266::network::{Clock, Config, Read, Serial, Write};
//! # use libesp8266::network::esp8266::Esp8266;
//! use libesp8266::network::application::http::LineSelector;
//! # struct Uart;
//! # impl Read for Uart { type Error = (); fn read(&mut self, _: &mut [u8]) -> Result<usize, ()> { Ok(0) } }
//! # impl Write for Uart {
//! #     type Error = ();
//! #     fn write(&mut self, b: &[u8]) -> Result<usize, ()> { Ok(b.len()) }
//! #     fn flush(&mut self) -> Result<(), ()> { Ok(()) }
//! # }
//! # impl Serial for Uart { fn bytes_available(&mut self) -> usize { 0 } }
//! # struct Ticks(u64);
//! # impl Clock for Ticks {
//! #     fn now_us(&mut self) -> u64 { self.0 }
//! #     fn delay_us(&mut self, us: u32) { self.0 += u64::from(us) }
//! # }
//! # let mut modem = Esp8266::new(Uart, Ticks(0), Config::default());
//! let mut body = [0u8; 256];
//! let response = modem.http_client().get_str(
//!     "93.184.216.34",
//!     80,
//!     "/",
//!     Some("example.com"),
//!     LineSelector::BODY,
//!     &mut body,
//! )?;
//! # Ok::<(), libesp8266::network::error::Error>(())
//! ```

/// HTTP GET client.
pub mod client;

/// Prefix-routed HTTP server.
pub mod server;

pub use crate::network::at::LineSelector;
pub use client::{HttpClient, HttpResponse};
pub use server::{ContentType, Handler, HttpServer, Reply, Route, Router};
