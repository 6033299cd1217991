mod common;

use common::{MockSerial, echo, modem};
use libesp8266::network::application::http::{
    ContentType, Handler, HttpResponse, LineSelector, Reply, Router,
};
use libesp8266::network::at::ip;
use libesp8266::network::error::Error;

const RESPONSE: &str = "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nhi";
const START: &str = "AT+CIPSTART=\"TCP\",\"93.184.216.34\",80";

fn ipd(payload: &str) -> String {
    format!("+IPD,{}:{}", payload.len(), payload)
}

/// Script the modem side of one GET up to the response stream.
fn script_get(serial: &mut MockSerial, request: &str, stream: &str) {
    serial.ok(START);
    serial.reply(format!("{}> ", echo(&format!("AT+CIPSEND={}", request.len()))));
    serial.reply(format!("{request}\r\nSEND OK\r\n{stream}"));
}

#[test]
fn test_get_body() {
    let request = "GET / HTTP/1.0\r\nHost: example.com\r\n\r\n";
    let mut serial = MockSerial::new();
    script_get(&mut serial, request, &format!("{}\r\nOK\r\nUnlink\r\n", ipd(RESPONSE)));
    let mut modem = modem(serial);

    let mut body = [0u8; 64];
    let response = modem
        .http_client()
        .get_str("93.184.216.34", 80, "/", Some("example.com"), LineSelector::BODY, &mut body)
        .unwrap();

    assert_eq!(
        response,
        HttpResponse {
            len: 2,
            status: Some(200)
        }
    );
    assert_eq!(&body[..3], b"hi\0");

    let serial = modem.channel().serial();
    assert!(serial.sent(&format!("{START}\r\n")));
    assert!(serial.sent("AT+CIPSEND=37\r\n"));
    assert!(serial.sent(request));
    assert!(!serial.sent("AT+CIPSTATUS"));
    assert!(!serial.sent("AT+RST"));
}

#[test]
fn test_get_headers_then_unlink() {
    let request = "GET /status HTTP/1.0\r\nHost: example.com\r\n\r\n";
    let mut serial = MockSerial::new();
    script_get(&mut serial, request, &format!("{}\r\nOK\r\nUnlink\r\n", ipd(RESPONSE)));
    let mut modem = modem(serial);

    let mut buf = [0u8; 64];
    let response = modem
        .http_client()
        .get(
            ip::parse("93.184.216.34").unwrap(),
            80,
            "/status",
            Some("example.com"),
            LineSelector::HEADERS,
            &mut buf,
        )
        .unwrap();

    assert_eq!(response.status, Some(200));
    assert_eq!(
        &buf[..response.len],
        b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n"
    );
    // The unread body and the Unlink were consumed by the teardown.
    assert_eq!(modem.channel().serial().unread(), 0);
    assert!(!modem.channel().serial().sent("AT+RST"));
}

#[test]
fn test_get_without_host() {
    let request = "GET /plain\r\n";
    let mut serial = MockSerial::new();
    script_get(&mut serial, request, &format!("{}Unlink\r\n", ipd("body only")));
    let mut modem = modem(serial);

    let mut buf = [0u8; 32];
    let response = modem
        .http_client()
        .get_str("93.184.216.34", 80, "/plain", None, LineSelector::BODY, &mut buf)
        .unwrap();

    assert_eq!(response.status, None);
    assert_eq!(&buf[..response.len], b"body only");
    assert!(modem.channel().serial().sent("AT+CIPSEND=12\r\n"));
}

#[test]
fn test_error_status_is_data() {
    let request = "GET /missing HTTP/1.0\r\nHost: example.com\r\n\r\n";
    let stream = ipd("HTTP/1.0 404 Not Found\r\n\r\nnope");
    let mut serial = MockSerial::new();
    script_get(&mut serial, request, &format!("{stream}Unlink\r\n"));
    let mut modem = modem(serial);

    let mut buf = [0u8; 32];
    let response = modem
        .http_client()
        .get_str("93.184.216.34", 80, "/missing", Some("example.com"), LineSelector::BODY, &mut buf)
        .unwrap();

    assert_eq!(response.status, Some(404));
    assert_eq!(&buf[..response.len], b"nope");
}

#[test]
fn test_missing_unlink_resets() {
    let request = "GET / HTTP/1.0\r\nHost: example.com\r\n\r\n";
    let mut serial = MockSerial::new();
    script_get(&mut serial, request, &format!("{}\r\nOK\r\n", ipd(RESPONSE)));
    serial.ok("AT+RST").ok("AT");
    let mut modem = modem(serial);

    let mut body = [0u8; 64];
    let response = modem
        .http_client()
        .get_str("93.184.216.34", 80, "/", Some("example.com"), LineSelector::BODY, &mut body)
        .unwrap();

    assert_eq!(response.status, Some(200));
    assert_eq!(&body[..response.len], b"hi");
    assert!(modem.channel().serial().sent("AT+RST\r\nAT\r\n"));
    assert_eq!(modem.channel().serial().replies_left(), 0);
}

#[test]
fn test_send_failure_closes_socket() {
    let mut serial = MockSerial::new();
    serial.ok(START);
    serial.reply(format!("{}link is not\r\nERROR\r\n", echo("AT+CIPSEND=37")));
    serial.ok("AT+CIPCLOSE");
    let mut modem = modem(serial);

    let mut body = [0u8; 64];
    let result = modem.http_client().get_str(
        "93.184.216.34",
        80,
        "/",
        Some("example.com"),
        LineSelector::BODY,
        &mut body,
    );

    assert_eq!(result, Err(Error::Device));
    let serial = modem.channel().serial();
    assert!(serial.sent("AT+CIPCLOSE\r\n"));
    assert!(!serial.sent("GET "));
}

#[test]
fn test_connect_failure_is_returned() {
    let mut serial = MockSerial::new();
    serial.reply(format!("{}ERROR\r\n", echo(START)));
    let mut modem = modem(serial);

    let mut body = [0u8; 8];
    let result = modem
        .http_client()
        .get_str("93.184.216.34", 80, "/", None, LineSelector::BODY, &mut body);

    assert_eq!(result, Err(Error::Device));
    assert!(!modem.channel().serial().sent("AT+CIPSEND"));
}

#[test]
fn test_invalid_address() {
    let mut modem = modem(MockSerial::new());
    let mut body = [0u8; 8];

    let result = modem
        .http_client()
        .get_str("example.com", 80, "/", None, LineSelector::BODY, &mut body);
    assert_eq!(result, Err(Error::InvalidAddress));
    assert!(modem.channel().serial().tx().is_empty());
}

struct Counter {
    hits: usize,
    body: &'static [u8],
}

impl Counter {
    fn new(body: &'static [u8]) -> Self {
        Self { hits: 0, body }
    }
}

impl Handler for Counter {
    fn handle(&mut self, _request: &[u8], response: &mut [u8]) -> Reply {
        self.hits += 1;
        Reply::text(200).body(response, self.body)
    }
}

#[test]
fn test_router_first_prefix_wins() {
    let mut led = Counter::new(b"on");
    let mut root = Counter::new(b"index");
    let mut router: Router<'_, 4> = Router::new();
    router.add("/led", &mut led).unwrap();
    router.add("/", &mut root).unwrap();

    let mut out = [0u8; 16];
    let reply = router.dispatch(b"/ledstatus", &mut out);
    assert_eq!(reply.code, 200);
    assert_eq!(&out[..reply.len], b"on");

    let reply = router.dispatch(b"GET /index.html HTTP/1.1\r\n", &mut out);
    assert_eq!(&out[..reply.len], b"index");

    drop(router);
    assert_eq!(led.hits, 1);
    assert_eq!(root.hits, 1);
}

#[test]
fn test_router_not_found() {
    let mut led = Counter::new(b"on");
    let mut router: Router<'_, 2> = Router::new();
    router.add("/led", &mut led).unwrap();

    let mut out = [0u8; 16];
    let reply = router.dispatch(b"GET /fan HTTP/1.1\r\n", &mut out);
    assert_eq!(reply.code, 404);
    assert_eq!(reply.content_type, ContentType::Text);
    assert_eq!(&out[..reply.len], b"Not Found");
}

#[test]
fn test_router_capacity() {
    let mut a = Counter::new(b"a");
    let mut b = Counter::new(b"b");
    let mut router: Router<'_, 1> = Router::new();
    assert_eq!(router.add("/a", &mut a), Ok(()));
    assert_eq!(router.add("/b", &mut b), Err(Error::Capacity));
    assert_eq!(router.len(), 1);
}

#[test]
fn test_closure_handler() {
    let mut hello = |_request: &[u8], response: &mut [u8]| Reply::json(201).body(response, b"{}");
    let mut router: Router<'_, 1> = Router::new();
    router.add("/", &mut hello).unwrap();

    let mut out = [0u8; 8];
    let reply = router.dispatch(b"POST /things", &mut out);
    assert_eq!(reply.code, 201);
    assert_eq!(reply.content_type, ContentType::Json);
    assert_eq!(&out[..reply.len], b"{}");
}

#[test]
fn test_server_start_and_stop() {
    let mut serial = MockSerial::new();
    serial.ok("AT+CIPMUX=1").ok("AT+CIPSERVER=1,8080").ok("AT+CIPSERVER=0");
    let mut modem = modem(serial);

    let mut server = modem.http_server::<64>(8080);
    assert_eq!(server.port(), 8080);
    server.start().unwrap();
    server.stop().unwrap();

    assert_eq!(
        modem.channel().serial().tx(),
        b"AT+CIPMUX=1\r\nAT+CIPSERVER=1,8080\r\nAT+CIPSERVER=0\r\n"
    );
}

#[test]
fn test_server_idle_poll() {
    let mut modem = modem(MockSerial::new());
    let mut router: Router<'_, 1> = Router::new();

    let mut server = modem.http_server::<64>(80);
    assert_eq!(server.poll(&mut router), Ok(None));
    assert!(modem.channel().serial().tx().is_empty());
}

#[test]
fn test_server_serves_request() {
    let mut serial = MockSerial::new();
    serial.push_rx("+IPD,0,36:GET /ledstatus HTTP/1.1\r\nHost: x\r\n\r\n");
    serial.reply(format!("{}> ", echo("AT+CIPSEND=0,46")));
    serial.reply("\r\nSEND OK\r\n");
    serial.ok("AT+CIPCLOSE=0");
    let mut modem = modem(serial);

    let mut led = Counter::new(b"on");
    let mut root = Counter::new(b"index");
    let mut router: Router<'_, 2> = Router::new();
    router.add("/led", &mut led).unwrap();
    router.add("/", &mut root).unwrap();

    let mut server = modem.http_server::<128>(80);
    assert_eq!(server.poll(&mut router), Ok(Some(200)));
    drop(router);
    assert_eq!((led.hits, root.hits), (1, 0));

    let serial = modem.channel().serial();
    assert_eq!(
        serial.tx_str(),
        "AT+CIPSEND=0,46\r\nHTTP/1.0 200\r\nContent-type: text/plain\r\n\r\non\r\nAT+CIPCLOSE=0\r\n"
    );
}

#[test]
fn test_server_replies_on_request_channel() {
    let mut serial = MockSerial::new();
    serial.push_rx("+IPD,3,10:GET /nope ");
    serial.reply(format!("{}> ", echo("AT+CIPSEND=3,53")));
    serial.reply("\r\nSEND OK\r\n");
    serial.ok("AT+CIPCLOSE=3");
    let mut modem = modem(serial);

    let mut led = Counter::new(b"on");
    let mut router: Router<'_, 1> = Router::new();
    router.add("/led", &mut led).unwrap();

    let mut server = modem.http_server::<64>(80);
    assert_eq!(server.poll(&mut router), Ok(Some(404)));

    let serial = modem.channel().serial();
    assert!(serial.sent("AT+CIPSEND=3,53\r\n"));
    assert!(serial.sent("HTTP/1.0 404\r\nContent-type: text/plain\r\n\r\nNot Found\r\n"));
    assert!(serial.sent("AT+CIPCLOSE=3\r\n"));
}

#[test]
fn test_server_raw_reply() {
    let raw = b"HTTP/1.0 302 Found\r\nLocation: /\r\n\r\n";
    let mut serial = MockSerial::new();
    serial.push_rx("+IPD,1,5:GET /");
    serial.reply(format!("{}> ", echo(&format!("AT+CIPSEND=1,{}", raw.len() + 2))));
    serial.reply("\r\nSEND OK\r\n");
    serial.ok("AT+CIPCLOSE=1");
    let mut modem = modem(serial);

    let mut redirect = |_request: &[u8], response: &mut [u8]| Reply::html(302).raw().body(response, raw);
    let mut router: Router<'_, 1> = Router::new();
    router.add("/", &mut redirect).unwrap();

    let mut server = modem.http_server::<64>(80);
    assert_eq!(server.poll(&mut router), Ok(Some(302)));

    let serial = modem.channel().serial();
    assert!(!serial.sent("Content-type"));
    assert!(serial.sent("HTTP/1.0 302 Found\r\nLocation: /\r\n\r\n\r\nAT+CIPCLOSE=1"));
}
