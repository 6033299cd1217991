//! Status vocabulary of the modem.

use crate::network::at::line::starts_with;
use crate::network::error::Error;

/// Outcome of one command/response exchange.
///
/// Every exchange resolves to exactly one of these. `Ok` is success; the
/// others map one-to-one onto [`Error`] through [`Status::into_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `OK`, `SEND OK`, the `>` data prompt and a few benign variants.
    Ok,
    /// The modem answered `ERROR`.
    Error,
    /// No recognised line before the timeout.
    Timeout,
    /// Receive buffer overflow during the exchange.
    Overflow,
    /// The modem answered `busy`.
    Busy,
    /// The modem printed `ready`: it rebooted mid-session.
    Ready,
}

/// Recognised status-line prefixes, most specific first. Matching is
/// case-sensitive and the first matching prefix wins.
const VOCABULARY: &[(&[u8], Status)] = &[
    (b"SEND OK", Status::Ok),
    (b"OK", Status::Ok),
    (b">", Status::Ok),
    (b"ERROR", Status::Error),
    (b"nochange", Status::Ok),
    (b"no change", Status::Ok),
    (b"ready", Status::Ready),
    (b"busy", Status::Busy),
    (b"Unlink", Status::Ok),
    (b"Link is builded", Status::Ok),
];

impl Status {
    /// Classify one response line. Returns `None` for data lines.
    pub fn classify(line: &[u8]) -> Option<Status> {
        VOCABULARY
            .iter()
            .find(|(prefix, _)| starts_with(line, prefix))
            .map(|(_, status)| *status)
    }

    /// `Ok(())` for [`Status::Ok`], the matching [`Error`] otherwise.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Status::Ok => Ok(()),
            Status::Error => Err(Error::Device),
            Status::Timeout => Err(Error::Timeout),
            Status::Overflow => Err(Error::Overflow),
            Status::Busy => Err(Error::Busy),
            Status::Ready => Err(Error::Rebooted),
        }
    }

    /// Stable numeric code, matching the modem library's historical values.
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
            Status::Timeout => 2,
            Status::Overflow => 3,
            Status::Ready => 4,
            Status::Busy => 5,
        }
    }
}

impl From<Result<(), Error>> for Status {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Status::Ok,
            Err(e) => e.status().unwrap_or(Status::Error),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Status::Ok => defmt::write!(f, "OK"),
            Status::Error => defmt::write!(f, "ERROR"),
            Status::Timeout => defmt::write!(f, "TIMEOUT"),
            Status::Overflow => defmt::write!(f, "OVERFLOW"),
            Status::Busy => defmt::write!(f, "BUSY"),
            Status::Ready => defmt::write!(f, "READY"),
        }
    }
}
