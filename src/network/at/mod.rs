//! The AT protocol engine.
//!
//! The ESP8266 speaks a line-based request/response dialect and interleaves
//! inbound TCP data as `+IPD` notifications. This module holds everything
//! needed to drive that dialect over a [`Serial`](crate::network::Serial)
//! link:
//!
//! - [`line`]: bounded line reads and data waits, the foundation of the rest
//! - [`status`]: the six-member [`Status`] vocabulary and line classification
//! - [`command`]: the [`CommandChannel`] request/response session
//! - [`ipd`]: the [`IpdReader`] packet demultiplexer with its HTTP overlay
//! - [`ip`]: dotted-quad text to and from `u32`
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ Line Reader  │──▶│ CommandChannel   │──▶│ IpdReader        │
//! │ (line.rs)    │   │ (echo, classify, │   │ (+IPD framing,   │
//! │              │   │  capture)        │   │  mux, HTTP)      │
//! └──────────────┘   └──────────────────┘   └──────────────────┘
//! ```

pub mod command;
pub mod ip;
pub mod ipd;
pub mod line;
pub mod status;

pub use command::{Command, CommandChannel, ResponseCapture};
pub use ipd::{IpdReader, LineSelector, Packet, Received};
pub use status::Status;

/// Line terminator appended by the engine to every command.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";
