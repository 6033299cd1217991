use crate::network::Serial;
use crate::network::at::{Command, IpdReader, LineSelector, ip};
use crate::network::error::Error;
use crate::network::esp8266::Esp8266;
use crate::network::time::Clock;
use core::fmt::Write;
use heapless::String;

/// `AT+CIPSTART="TCP","255.255.255.255",65535` fits with room to spare.
const MAX_START_COMMAND_LEN: usize = 64;

const REQUEST_METHOD: &str = "GET ";
const REQUEST_VERSION: &str = " HTTP/1.0\r\nHost: ";
const CRLF: &str = "\r\n";

/// Result of one GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    /// Bytes stored in the caller's buffer.
    pub len: usize,
    /// Status code, when the server sent a status line. Requests made without
    /// a host carry no HTTP version, and servers answer those without one.
    pub status: Option<u16>,
}

/// A one-shot HTTP GET client on top of the modem's TCP socket.
///
/// Each request opens a socket, sends the request, collects the `+IPD`
/// stream and waits for the modem to report `Unlink`. With a host the
/// request is HTTP/1.0 so that servers never reply with chunked encoding.
#[derive(Debug)]
pub struct HttpClient<'d, S, C> {
    device: &'d mut Esp8266<S, C>,
}

impl<'d, S: Serial, C: Clock> HttpClient<'d, S, C> {
    /// A client borrowing `device`.
    pub fn new(device: &'d mut Esp8266<S, C>) -> Self {
        Self { device }
    }

    /// GET `path` from the dotted-quad address `ip`.
    pub fn get_str(
        &mut self,
        ip: &str,
        port: u16,
        path: &str,
        host: Option<&str>,
        selector: LineSelector,
        buf: &mut [u8],
    ) -> Result<HttpResponse, Error> {
        let ip = ip::parse(ip)?;
        self.get(ip, port, path, host, selector, buf)
    }

    /// GET `path` from `ip:port` and collect the response into `buf`.
    ///
    /// `selector` picks which lines are kept (see [`LineSelector`]); it is
    /// applied to the header block only when a `host` is given. The buffer is
    /// NUL-terminated after `len` bytes.
    pub fn get(
        &mut self,
        ip: u32,
        port: u16,
        path: &str,
        host: Option<&str>,
        selector: LineSelector,
        buf: &mut [u8],
    ) -> Result<HttpResponse, Error> {
        // --- Open Socket ---
        let mut start: String<MAX_START_COMMAND_LEN> = String::new();
        write!(start, "AT+CIPSTART=\"TCP\",\"{}\",{}", ip::format(ip), port)
            .map_err(|_| Error::Capacity)?;
        self.device.channel_mut().send(&start)?;

        // --- Send Request ---
        let mut send: String<24> = String::new();
        write!(send, "AT+CIPSEND={}", request_len(path, host)).map_err(|_| Error::Capacity)?;
        if let Err(e) = self.device.channel_mut().send(&send) {
            self.close();
            return Err(e);
        }

        let request = match host {
            Some(host) => Command::new(REQUEST_METHOD)
                .part(path)
                .part(REQUEST_VERSION)
                .part(host)
                .part(CRLF),
            None => Command::new(REQUEST_METHOD).part(path),
        };
        if let Err(e) = self.device.channel_mut().execute(&request, None) {
            self.close();
            return Err(e);
        }

        // --- Receive Response ---
        let reader = IpdReader::new(self.device.channel_mut());
        let received = match host {
            Some(_) => reader.http(selector).read(buf),
            None => reader.lines(selector).read(buf),
        };

        // --- Tear Down ---
        let unlinked = matches!(received, Ok(r) if r.unlinked);
        if !unlinked && self.device.channel_mut().await_unlink().is_err() {
            warn!("no Unlink after GET, resetting modem");
            if let Err(_e) = self.device.reset() {
                warn!("reset after GET failed: {}", _e);
            }
        }

        let received = received?;
        Ok(HttpResponse {
            len: received.len,
            status: received.status,
        })
    }

    fn close(&mut self) {
        if let Err(_e) = self.device.channel_mut().send("AT+CIPCLOSE") {
            debug!("CIPCLOSE failed: {}", _e);
        }
    }
}

/// Length of the request as sent: `GET <path>[ HTTP/1.0\r\nHost: <host>\r\n]`
/// plus the CRLF the engine appends.
pub fn request_len(path: &str, host: Option<&str>) -> usize {
    let mut len = REQUEST_METHOD.len() + path.len() + CRLF.len();
    if let Some(host) = host {
        len += REQUEST_VERSION.len() + host.len() + CRLF.len();
    }
    len
}
