//! # Application Layer Protocols
//!
//! Protocols layered on the AT engine. The modem runs the TCP/IP stack; the
//! code here only frames requests and responses on top of its sockets.
//!
//! - **[`http`]**: a one-shot HTTP/1.0 GET client and a small prefix-routed
//!   HTTP server
//!
//! Both borrow an [`Esp8266`](crate::network::esp8266::Esp8266) for the
//! duration of their use, so only one of them drives the modem at a time.

/// HTTP client and server shims.
pub mod http;
