//! Shutdown signalling and shutdown-aware sleeping.
//!
//! A [`ShutdownSignal`] is the only cancellation channel in the system.
//! Signal handlers set it; [`ThreadSleeper`] checks it between short
//! slices so every settle and dwell delay notices it promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::info;

use crate::app::ports::{Cancelled, Sleeper};

/// Longest uninterrupted slice of a cancellable sleep.
pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cloneable, thread-safe "please stop" flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Real-time [`Sleeper`] backed by `std::thread::sleep`.
pub struct ThreadSleeper {
    shutdown: ShutdownSignal,
}

impl ThreadSleeper {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown.is_requested() {
                return Err(Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
