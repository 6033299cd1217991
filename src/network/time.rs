//! Monotonic time source and deadlines.
//!
//! Every wait in the driver is a bounded poll: check the receive buffer,
//! sleep for the configured poll interval, check the deadline. The clock is
//! injected so that the same code runs on a bare-metal timer, on a host with
//! [`StdClock`], or in tests with a simulated clock.

/// A monotonic microsecond clock with a blocking delay.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin. Must never go backwards.
    fn now_us(&mut self) -> u64;

    /// Block for roughly `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Block for roughly `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}

/// A point after which a bounded wait gives up.
///
/// A deadline is expired once the elapsed time is greater than or equal to
/// its bound. It can be restarted, which is how the packet reader turns a
/// whole-transfer timeout into a per-packet idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start_us: u64,
    bound_us: u64,
}

impl Deadline {
    /// Start a deadline `bound_us` microseconds from now.
    pub fn start<C: Clock>(clock: &mut C, bound_us: u64) -> Self {
        Self {
            start_us: clock.now_us(),
            bound_us,
        }
    }

    /// Restart the deadline from now, keeping its bound.
    pub fn restart<C: Clock>(&mut self, clock: &mut C) {
        self.start_us = clock.now_us();
    }

    /// `true` once `bound_us` or more has elapsed since the (re)start.
    pub fn expired<C: Clock>(&self, clock: &mut C) -> bool {
        clock.now_us().saturating_sub(self.start_us) >= self.bound_us
    }

    /// The configured bound in microseconds.
    pub fn bound_us(&self) -> u64 {
        self.bound_us
    }
}

/// [`Clock`] backed by [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// A clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&mut self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
