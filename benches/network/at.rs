use criterion::{Criterion, Throughput};
use std::hint::black_box;
use libesp8266::network::at::{CommandChannel, IpdReader, LineSelector, ResponseCapture, Status};
use libesp8266::network::{Clock, Config, Read, Serial, Write};
use std::collections::VecDeque;

/// In-memory link: `script` is replayed into the receive side on every flush
/// and by `load`.
struct LoopbackSerial {
    rx: VecDeque<u8>,
    script: Vec<u8>,
}

impl LoopbackSerial {
    fn new(script: &[u8]) -> Self {
        Self {
            rx: VecDeque::with_capacity(script.len()),
            script: script.to_vec(),
        }
    }

    fn load(&mut self) {
        self.rx.clear();
        self.rx.extend(&self.script);
    }
}

impl Read for LoopbackSerial {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for LoopbackSerial {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.load();
        Ok(())
    }
}

impl Serial for LoopbackSerial {
    fn bytes_available(&mut self) -> usize {
        self.rx.len()
    }
}

struct FastClock(u64);

impl Clock for FastClock {
    fn now_us(&mut self) -> u64 {
        self.0
    }

    fn delay_us(&mut self, us: u32) {
        self.0 += u64::from(us);
    }
}

fn session(script: &[u8]) -> CommandChannel<LoopbackSerial, FastClock> {
    let config = Config {
        // Idle timeouts end every packet read; keep them short.
        command_timeout_us: 1_000,
        ..Config::default()
    };
    CommandChannel::new(LoopbackSerial::new(script), FastClock(0), config)
}

fn ipd_stream(packets: usize, payload: &[u8]) -> Vec<u8> {
    let mut stream = Vec::new();
    for _ in 0..packets {
        stream.extend_from_slice(format!("+IPD,{}:", payload.len()).as_bytes());
        stream.extend_from_slice(payload);
        stream.extend_from_slice(b"\r\nOK\r\n");
    }
    stream.extend_from_slice(b"Unlink\r\n");
    stream
}

pub fn bench_classify(c: &mut Criterion) {
    let lines: [&[u8]; 6] = [
        b"SEND OK\r",
        b"192.168.4.1\r",
        b"ERROR\r",
        b"+CWLAP:(3,\"home\",-60)\r",
        b"Link is builded\r",
        b"busy p...\r",
    ];

    let mut group = c.benchmark_group("status");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("classify", |b| {
        b.iter(|| {
            for line in lines {
                black_box(Status::classify(black_box(line)));
            }
        })
    });
    group.finish();
}

pub fn bench_command_round_trip(c: &mut Criterion) {
    let mut session = session(b"AT+CIFSR\r\r\n192.168.4.1\r\n\r\nOK\r\n");
    let mut buf = [0u8; 32];

    c.bench_function("command_with_capture", |b| {
        b.iter(|| {
            let mut capture = ResponseCapture::new(&mut buf);
            let status = session.query(black_box("AT+CIFSR"), &mut capture);
            black_box((status, capture.len()));
        })
    });
}

pub fn bench_ipd_coalesce(c: &mut Criterion) {
    let payload = [b'x'; 64];
    let stream = ipd_stream(16, &payload);
    let mut session = session(&stream);
    let mut buf = [0u8; 2048];

    let mut group = c.benchmark_group("ipd");
    group.throughput(Throughput::Bytes((16 * payload.len()) as u64));
    group.bench_function("coalesce_16x64", |b| {
        b.iter(|| {
            session.serial_mut().load();
            let received = IpdReader::new(&mut session).read(&mut buf);
            black_box(received)
        })
    });
    group.finish();
}

pub fn bench_http_body(c: &mut Criterion) {
    let mut response = Vec::new();
    response.extend_from_slice(b"HTTP/1.0 200 OK\r\nServer: bench\r\nContent-Type: text/plain\r\n\r\n");
    for i in 0..32 {
        response.extend_from_slice(format!("line {i}\r\n").as_bytes());
    }
    let stream = ipd_stream(1, &response);
    let mut session = session(&stream);
    let mut buf = [0u8; 512];

    c.bench_function("http_body_only", |b| {
        b.iter(|| {
            session.serial_mut().load();
            let received = IpdReader::new(&mut session)
                .http(LineSelector::BODY)
                .read(&mut buf);
            black_box(received)
        })
    });
}
