//! Break-beam watchdog: the jam interlock.
//!
//! An object that is still blocking a beam some seconds after it was first
//! seen is stuck or was forced in; the door must lock until someone clears
//! it.  The watchdog only keeps the timers.  The controller polls it every
//! cycle, re-reads the beam for each due timer, and requests the lock
//! sequence.
//!
//! ## Timer lifecycle
//!
//! 1. A beam edge (or a routing move through that beam) calls [`arm`].
//!    An existing timer for the same beam is replaced, never stacked.
//! 2. [`poll_due`] removes and returns every timer whose fire time has
//!    passed.
//! 3. If the lock sequence was refused because the actuators were busy,
//!    [`retry`] re-arms the timer once after a short backoff.  A second
//!    refusal drops it.
//!
//! [`arm`]: BreakBeamWatchdog::arm
//! [`poll_due`]: BreakBeamWatchdog::poll_due
//! [`retry`]: BreakBeamWatchdog::retry

use log::{debug, info, warn};

use crate::config::BinConfig;
use crate::sensors::BeamId;

/// One pending confirmation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTimer {
    pub beam: BeamId,
    pub armed_at_ms: u64,
    pub fire_at_ms: u64,
    /// Already deferred once because the sequencer was busy.
    pub retried: bool,
}

/// Watchdog with one slot per beam.
pub struct BreakBeamWatchdog {
    confirm_delay_ms: u64,
    retry_backoff_ms: u64,
    slots: [Option<WatchdogTimer>; BeamId::ALL.len()],
}

impl BreakBeamWatchdog {
    pub fn new(confirm_delay_ms: u64, retry_backoff_ms: u64) -> Self {
        Self {
            confirm_delay_ms,
            retry_backoff_ms,
            slots: [None; BeamId::ALL.len()],
        }
    }

    pub fn from_config(config: &BinConfig) -> Self {
        Self::new(config.beam_confirm_delay_ms, config.watchdog_retry_backoff_ms)
    }

    /// Schedule a confirmation check for `beam`, replacing any pending one.
    pub fn arm(&mut self, beam: BeamId, now_ms: u64) {
        let slot = &mut self.slots[beam.index()];
        if slot.is_some() {
            debug!("{} watchdog re-armed at {}ms", beam, now_ms);
        }
        *slot = Some(WatchdogTimer {
            beam,
            armed_at_ms: now_ms,
            fire_at_ms: now_ms.saturating_add(self.confirm_delay_ms),
            retried: false,
        });
    }

    /// Drop the pending check for `beam`, if any.
    pub fn cancel(&mut self, beam: BeamId) -> bool {
        self.slots[beam.index()].take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; BeamId::ALL.len()];
    }

    pub fn pending(&self, beam: BeamId) -> Option<&WatchdogTimer> {
        self.slots[beam.index()].as_ref()
    }

    pub fn armed_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Remove and return every timer due at `now_ms`, in beam order.
    pub fn poll_due(&mut self, now_ms: u64) -> heapless::Vec<WatchdogTimer, 4> {
        let mut due = heapless::Vec::new();
        for slot in self.slots.iter_mut() {
            if slot.is_some_and(|t| now_ms >= t.fire_at_ms) {
                if let Some(timer) = slot.take() {
                    // One slot per beam, so this never overflows.
                    let _ = due.push(timer);
                }
            }
        }
        due
    }

    /// Defer a fired timer that could not get the actuators.
    ///
    /// Returns `true` if the check was rescheduled, `false` if it had
    /// already been retried (dropped) or a newer arm superseded it.
    pub fn retry(&mut self, fired: WatchdogTimer, now_ms: u64) -> bool {
        if fired.retried {
            warn!(
                "{} watchdog dropped: actuators still busy after retry",
                fired.beam
            );
            return false;
        }
        let slot = &mut self.slots[fired.beam.index()];
        if slot.is_some() {
            debug!("{} watchdog retry superseded by a newer arm", fired.beam);
            return false;
        }
        info!(
            "{} watchdog deferred {}ms: actuators busy",
            fired.beam, self.retry_backoff_ms
        );
        *slot = Some(WatchdogTimer {
            fire_at_ms: now_ms.saturating_add(self.retry_backoff_ms),
            retried: true,
            ..fired
        });
        true
    }
}
