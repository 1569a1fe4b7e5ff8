//! Inbound requests to the controller.
//!
//! These represent actions requested by the outside world (buttons, a
//! kiosk UI, a maintenance shell).  They travel through the
//! [`RequestQueue`](crate::events::RequestQueue) and the
//! [`BinController`](super::service::BinController) interprets them once
//! per tick, on the control thread.

/// Requests from outside the sensor path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Classify now, skipping the motion debouncer.  Ignored unless idle.
    Activate,
    /// Flag the last classification as wrong.  `at_ms` is when the button
    /// was pressed, so a press during actuation is judged fairly.
    Challenge { at_ms: u64 },
    /// Release the door lock after a jam or full-bin lockout was cleared.
    ClearLock,
    /// Erase the maintenance log after a service visit.
    ResetMaintenance,
}
