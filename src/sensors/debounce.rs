//! Edge debouncer for the motion and break-beam inputs.
//!
//! The PIR fires a burst of edges for a single approach, and a stale edge
//! can be delivered after the physical condition has already cleared.  An
//! edge becomes a [`DebouncedTrigger`] only when
//!
//! 1. more than the source's debounce window has elapsed since the last
//!    accepted trigger for that source, and
//! 2. the pin still reads active when the control thread processes it.
//!
//! The debouncer holds no hardware; the caller passes the current level.

use log::debug;

use super::{DebouncedTrigger, SensorSource};
use crate::config::BinConfig;

pub struct SensorDebouncer {
    windows_ms: [u64; SensorSource::COUNT],
    /// `None` = never accepted (behaves as infinitely far in the past).
    last_accepted_ms: [Option<u64>; SensorSource::COUNT],
}

impl SensorDebouncer {
    /// Build with the motion window for the PIR and the beam window for
    /// every break-beam.
    pub fn new(motion_window_ms: u64, beam_window_ms: u64) -> Self {
        let mut windows_ms = [beam_window_ms; SensorSource::COUNT];
        windows_ms[SensorSource::Motion.index()] = motion_window_ms;
        Self {
            windows_ms,
            last_accepted_ms: [None; SensorSource::COUNT],
        }
    }

    pub fn from_config(config: &BinConfig) -> Self {
        Self::new(config.motion_debounce_ms, config.beam_debounce_ms)
    }

    /// Decide whether an edge from `source` at `now_ms` is a new trigger.
    ///
    /// `pin_active` is the level read from hardware at processing time.
    pub fn report(&mut self, source: SensorSource, now_ms: u64, pin_active: bool) -> bool {
        self.accept(source, now_ms, pin_active).is_some()
    }

    /// Like [`report`](Self::report) but returns the trigger itself.
    pub fn accept(
        &mut self,
        source: SensorSource,
        now_ms: u64,
        pin_active: bool,
    ) -> Option<DebouncedTrigger> {
        if !pin_active {
            debug!("Debounce: {source} edge dropped, pin no longer active");
            return None;
        }

        let idx = source.index();
        if let Some(last) = self.last_accepted_ms[idx] {
            if now_ms.saturating_sub(last) <= self.windows_ms[idx] {
                debug!(
                    "Debounce: {source} edge suppressed ({}ms since last)",
                    now_ms.saturating_sub(last)
                );
                return None;
            }
        }

        self.last_accepted_ms[idx] = Some(now_ms);
        Some(DebouncedTrigger {
            source,
            timestamp_ms: now_ms,
        })
    }

    /// Timestamp of the last accepted trigger for `source`.
    pub fn last_accepted(&self, source: SensorSource) -> Option<u64> {
        self.last_accepted_ms[source.index()]
    }

    /// Configured window for `source`.
    pub fn window_ms(&self, source: SensorSource) -> u64 {
        self.windows_ms[source.index()]
    }
}
