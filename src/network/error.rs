//! Common error types for modem operations

use crate::network::at::Status;

/// A common error type for modem operations.
///
/// The first five variants mirror the non-OK members of [`Status`], i.e. what
/// the modem itself reported (or failed to report in time). The rest are
/// raised locally by the driver. It is designed to be simple and portable for
/// `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The modem answered `ERROR`.
    Device,
    /// No recognised status line arrived before the timeout.
    Timeout,
    /// The serial receive buffer overflowed during the exchange.
    Overflow,
    /// The modem answered `busy`.
    Busy,
    /// The modem printed `ready`, i.e. it rebooted and lost all session state.
    Rebooted,
    /// An error occurred while writing to the serial link.
    WriteError,
    /// A fixed-capacity buffer or table could not hold the data.
    Capacity,
    /// An IPv4 address could not be parsed.
    InvalidAddress,
    /// A configuration document could not be parsed.
    InvalidConfig,
    /// Connection teardown (`Unlink`) was not observed; a reset is advised.
    UnlinkFailed,
}

impl Error {
    /// The [`Status`] this error corresponds to, if it is a modem status.
    pub fn status(self) -> Option<Status> {
        match self {
            Error::Device => Some(Status::Error),
            Error::Timeout => Some(Status::Timeout),
            Error::Overflow => Some(Status::Overflow),
            Error::Busy => Some(Status::Busy),
            Error::Rebooted => Some(Status::Ready),
            _ => None,
        }
    }

    /// Short human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            Error::Device => "General Error",
            Error::Timeout => "Timeout Waiting For Response",
            Error::Overflow => "Overflow In Serial Buffer",
            Error::Busy => "Device Is Busy",
            Error::Rebooted => "Device issued \"ready\" unexpectedly (rebooted)",
            Error::WriteError => "Serial Write Failed",
            Error::Capacity => "Buffer Capacity Exceeded",
            Error::InvalidAddress => "Invalid IPv4 Address",
            Error::InvalidConfig => "Invalid Configuration",
            Error::UnlinkFailed => "Connection Did Not Unlink",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Device => defmt::write!(f, "Device"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::Overflow => defmt::write!(f, "Overflow"),
            Error::Busy => defmt::write!(f, "Busy"),
            Error::Rebooted => defmt::write!(f, "Rebooted"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::Capacity => defmt::write!(f, "Capacity"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Error::UnlinkFailed => defmt::write!(f, "UnlinkFailed"),
        }
    }
}
