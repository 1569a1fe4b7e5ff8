//! Host time adapter.
//!
//! Provides monotonic time and shutdown-aware sleeping for the
//! controller on a Linux board.
//!
//! - [`MonotonicClock`]: milliseconds since construction, from
//!   `std::time::Instant` (never jumps with wall-clock changes).
//! - [`HostTime`]: the clock plus a [`ThreadSleeper`], i.e. everything
//!   the controller's `T: Clock + Sleeper` parameter needs.

use std::time::{Duration, Instant};

use crate::app::ports::{Cancelled, Clock, Sleeper};
use crate::drivers::shutdown::{ShutdownSignal, ThreadSleeper};

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since start (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Real clock and real, cancellable sleeps.
pub struct HostTime {
    clock: MonotonicClock,
    sleeper: ThreadSleeper,
}

impl HostTime {
    /// `clock` may be shared (it is `Copy`) with threads that stamp
    /// requests, so both sides agree on "now".
    pub fn new(clock: MonotonicClock, shutdown: ShutdownSignal) -> Self {
        Self {
            clock,
            sleeper: ThreadSleeper::new(shutdown),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.clock.uptime_secs()
    }
}

impl Clock for HostTime {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl Sleeper for HostTime {
    fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        self.sleeper.sleep(duration)
    }

    fn pause(&mut self, duration: Duration) {
        self.sleeper.pause(duration);
    }
}
