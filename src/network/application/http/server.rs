//! Minimal HTTP server on the modem's multiplexed listening socket.
//!
//! Requests are dispatched through a [`Router`]: an ordered table of
//! `(prefix, handler)` pairs where the first prefix matching the request
//! path wins. A handler fills the response buffer and returns a [`Reply`];
//! the server adds the status line and `Content-type` header unless the
//! handler asked for raw output.
//!
//! ```rust,ignore
//! let mut status = |_req: &[u8], out: &mut [u8]| Reply::text(200).body(out, b"on");
//! let mut router: Router<'_, 4> = Router::new();
//! router.add("/led", &mut status)?;
//!
//! let mut server = modem.http_server::<256>(80);
//! server.start()?;
//! loop {
//!     server.poll(&mut router)?;
//! }
//! ```

use crate::network::Serial;
use crate::network::at::{Command, IpdReader};
use crate::network::error::Error;
use crate::network::esp8266::Esp8266;
use crate::network::time::Clock;
use core::fmt::Write;
use heapless::{String, Vec};

/// Content type tag of a [`Reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `text/html`
    Html,
    /// `text/plain`
    Text,
    /// `application/json`
    Json,
    /// `application/octet-stream`
    Plain,
}

impl ContentType {
    /// MIME type sent in the `Content-type` header.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Text => "text/plain",
            ContentType::Json => "application/json",
            ContentType::Plain => "application/octet-stream",
        }
    }
}

/// What a [`Handler`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code.
    pub code: u16,
    /// Content type for the generated header.
    pub content_type: ContentType,
    /// The response buffer already holds complete headers; send it verbatim.
    pub raw: bool,
    /// Bytes of the response buffer to send.
    pub len: usize,
}

impl Reply {
    /// An empty reply with `code` and `content_type`.
    pub fn new(code: u16, content_type: ContentType) -> Self {
        Self {
            code,
            content_type,
            raw: false,
            len: 0,
        }
    }

    /// An empty `text/html` reply.
    pub fn html(code: u16) -> Self {
        Self::new(code, ContentType::Html)
    }

    /// An empty `text/plain` reply.
    pub fn text(code: u16) -> Self {
        Self::new(code, ContentType::Text)
    }

    /// An empty `application/json` reply.
    pub fn json(code: u16) -> Self {
        Self::new(code, ContentType::Json)
    }

    /// Mark the reply as carrying its own headers.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Copy `body` into `out` (truncating to fit) and record its length.
    pub fn body(mut self, out: &mut [u8], body: &[u8]) -> Self {
        let len = body.len().min(out.len());
        out[..len].copy_from_slice(&body[..len]);
        self.len = len;
        self
    }
}

/// Handles one request.
///
/// `request` is the raw captured request (request line first). The handler
/// writes its body, or a full response when [`Reply::raw`] is set, into
/// `response` and reports how many bytes it wrote.
pub trait Handler {
    /// Produce the reply for `request`.
    fn handle(&mut self, request: &[u8], response: &mut [u8]) -> Reply;
}

impl<F> Handler for F
where
    F: FnMut(&[u8], &mut [u8]) -> Reply,
{
    fn handle(&mut self, request: &[u8], response: &mut [u8]) -> Reply {
        self(request, response)
    }
}

/// One entry of the route table.
pub struct Route<'h> {
    /// Path prefix, such as `/led`.
    pub prefix: &'h str,
    handler: &'h mut dyn Handler,
}

impl core::fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Route").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}

/// Ordered route table with room for `R` routes.
#[derive(Debug)]
pub struct Router<'h, const R: usize> {
    routes: Vec<Route<'h>, R>,
}

impl<'h, const R: usize> Router<'h, R> {
    /// An empty table.
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Append a route. Earlier routes take precedence.
    pub fn add(&mut self, prefix: &'h str, handler: &'h mut dyn Handler) -> Result<(), Error> {
        self.routes
            .push(Route { prefix, handler })
            .map_err(|_| Error::Capacity)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// `true` if no route was added.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run the first handler whose prefix matches `request`.
    ///
    /// A leading `GET ` or `POST ` is skipped before matching. With no match
    /// the reply is a built-in `404 Not Found`.
    pub fn dispatch(&mut self, request: &[u8], response: &mut [u8]) -> Reply {
        let target = request_target(request);
        match self
            .routes
            .iter_mut()
            .find(|route| target.starts_with(route.prefix.as_bytes()))
        {
            Some(route) => {
                info!("route {}", route.prefix);
                route.handler.handle(request, response)
            }
            None => {
                info!("no route, 404");
                Reply::text(404).body(response, b"Not Found")
            }
        }
    }
}

impl<const R: usize> Default for Router<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

fn request_target(request: &[u8]) -> &[u8] {
    for method in [b"GET ".as_slice(), b"POST ".as_slice()] {
        if let Some(rest) = request.strip_prefix(method) {
            return rest;
        }
    }
    request
}

/// HTTP server bound to one modem, with `N`-byte request and response
/// buffers.
#[derive(Debug)]
pub struct HttpServer<'d, S, C, const N: usize> {
    device: &'d mut Esp8266<S, C>,
    port: u16,
    request: [u8; N],
    response: [u8; N],
}

impl<'d, S: Serial, C: Clock, const N: usize> HttpServer<'d, S, C, N> {
    /// A server on `port`. Nothing is sent until [`start`](Self::start).
    pub fn new(device: &'d mut Esp8266<S, C>, port: u16) -> Self {
        Self {
            device,
            port,
            request: [0; N],
            response: [0; N],
        }
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Enable multiplexing and open the listening socket.
    pub fn start(&mut self) -> Result<(), Error> {
        let mut command: String<32> = String::new();
        write!(command, "AT+CIPSERVER=1,{}", self.port).map_err(|_| Error::Capacity)?;
        let channel = self.device.channel_mut();
        channel.send("AT+CIPMUX=1")?;
        channel.send(&command)?;
        info!("listening on port {}", self.port);
        Ok(())
    }

    /// Close the listening socket.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.device.channel_mut().send("AT+CIPSERVER=0")
    }

    /// Serve at most one request.
    ///
    /// Waits up to `data_wait_ms` for inbound data. Returns `Ok(None)` if
    /// nothing arrived, otherwise the status code that was sent.
    pub fn poll<const R: usize>(&mut self, router: &mut Router<'_, R>) -> Result<Option<u16>, Error> {
        let channel = self.device.channel_mut();
        let wait_us = u64::from(channel.config().data_wait_ms) * 1_000;
        if channel.wait_for_data(wait_us) == 0 {
            return Ok(None);
        }

        let received = match IpdReader::new(channel).read(&mut self.request) {
            Ok(received) => received,
            Err(Error::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        let link = received.channel.unwrap_or(0);
        debug!("request of {} bytes on channel {}", received.len, link);

        self.response.fill(0);
        let reply = router.dispatch(&self.request[..received.len], &mut self.response);
        let body = &self.response[..reply.len.min(N)];

        let mut header: String<64> = String::new();
        if !reply.raw {
            write!(
                header,
                "HTTP/1.0 {}\r\nContent-type: {}\r\n\r\n",
                reply.code,
                reply.content_type.as_str()
            )
            .map_err(|_| Error::Capacity)?;
        }

        let mut send: String<32> = String::new();
        write!(send, "AT+CIPSEND={},{}", link, header.len() + body.len() + 2)
            .map_err(|_| Error::Capacity)?;
        let mut close: String<24> = String::new();
        write!(close, "AT+CIPCLOSE={}", link).map_err(|_| Error::Capacity)?;

        let channel = self.device.channel_mut();
        let sent = channel.send(&send).and_then(|()| {
            let payload = Command::new(&header).bytes(body);
            channel.execute(&payload, None)
        });
        let closed = channel.send(&close);
        sent?;
        closed?;
        Ok(Some(reply.code))
    }
}
