//! Interrupt-style event queues.
//!
//! Events are produced by:
//! - GPIO edge callbacks (motion, four break-beams)
//! - Operator inputs (activate button, challenge button, lock reset)
//!
//! Events are consumed by the control thread, which drains them once per
//! poll cycle.  Producers never touch actuators.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ GPIO edge   │────▶│  EdgeQueue   │────▶│                │
//! └─────────────┘     └──────────────┘     │ Control thread │
//! ┌─────────────┐     ┌──────────────┐     │  (consumer)    │
//! │ Operator    │────▶│ RequestQueue │────▶│                │
//! └─────────────┘     └──────────────┘     └────────────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

pub use crate::app::commands::ControlRequest;
use crate::sensors::{SensorEvent, SensorSource};

/// Depth of the edge queue.  Four beams plus a chattering PIR fit easily
/// within one poll cycle.
pub const EDGE_QUEUE_CAP: usize = 32;

/// Depth of the operator request queue.
pub const REQUEST_QUEUE_CAP: usize = 8;

/// Bounded, non-blocking MPMC queue safe to push from callback context.
pub struct EventQueue<T, const N: usize> {
    channel: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> EventQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push an event.  Returns `false` if the queue is full (event dropped).
    pub fn push_event(&self, event: T) -> bool {
        if self.channel.try_send(event).is_err() {
            warn!("Event queue full ({N}), event dropped");
            return false;
        }
        true
    }

    /// Pop the next event, if any.
    pub fn pop_event(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain_events(&self, mut handler: impl FnMut(T)) {
        while let Some(event) = self.pop_event() {
            handler(event);
        }
    }

    pub fn queue_is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.channel.len()
    }
}

impl<T, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub type EdgeQueue = EventQueue<SensorEvent, EDGE_QUEUE_CAP>;
pub type RequestQueue = EventQueue<ControlRequest, REQUEST_QUEUE_CAP>;

/// Handle given to the GPIO layer's `on_falling_edge` registration.
///
/// Cloneable and `Send`; each call records the edge and returns.
#[derive(Clone)]
pub struct EdgeNotifier {
    queue: Arc<EdgeQueue>,
}

impl EdgeNotifier {
    pub fn new(queue: Arc<EdgeQueue>) -> Self {
        Self { queue }
    }

    /// Record an edge from `source` observed at `now_ms`.
    pub fn notify(&self, source: SensorSource, now_ms: u64) -> bool {
        self.queue.push_event(SensorEvent {
            source,
            timestamp_ms: now_ms,
        })
    }
}
