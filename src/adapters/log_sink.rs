//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every [`BinEvent`] as one
//! structured line through the `log` facade.  A dashboard or MQTT
//! adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::BinEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BinEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BinEvent) {
        match event {
            BinEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            BinEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            BinEvent::Decided(d) => {
                info!(
                    "DECIDE | category={} score={:.2} recyclable={} at={}ms",
                    d.category_name, d.score, d.is_recyclable, d.decided_at_ms
                );
            }
            BinEvent::SequenceCompleted { kind, lock_engaged } => {
                info!("SEQ | {:?} complete | lock_engaged={}", kind, lock_engaged);
            }
            BinEvent::ActuatorFault(fault) => {
                error!("FAULT | {} | maintenance required", fault);
            }
            BinEvent::JamLockEngaged(beam) => {
                warn!("JAM | {} blocked, door locked", beam);
            }
            BinEvent::LockCleared => {
                info!("LOCK | cleared");
            }
            BinEvent::MaintenanceCleared(faults) => {
                info!("MAINT | cleared | faults={}", faults);
            }
            BinEvent::ChallengeAccepted { category, id } => {
                info!("CHALLENGE | accepted | category={} id={}", category, id);
            }
            BinEvent::ChallengeRejected(reason) => {
                info!("CHALLENGE | rejected | {}", reason);
            }
            BinEvent::ImageSaved(path) => {
                info!("IMAGE | saved {}", path.display());
            }
            BinEvent::ShutdownComplete => {
                info!("STOP | outputs safe");
            }
        }
    }
}
