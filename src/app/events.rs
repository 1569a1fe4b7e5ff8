//! Outbound application events.
//!
//! The [`BinController`](super::service::BinController) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log a line, feed a dashboard, record
//! them in a test.

use std::path::PathBuf;

use uuid::Uuid;

use crate::control::gate::SortDecision;
use crate::control::sequencer::SequenceKind;
use crate::error::{ActuatorFault, ChallengeError};
use crate::fsm::StateId;
use crate::sensors::BeamId;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum BinEvent {
    /// The controller finished homing and entered its first state.
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A capture was classified.
    Decided(SortDecision),

    SequenceCompleted { kind: SequenceKind, lock_engaged: bool },

    /// A sequence aborted; outputs were driven safe.
    ActuatorFault(ActuatorFault),

    /// A beam stayed blocked past the confirm delay and the door locked.
    JamLockEngaged(BeamId),

    LockCleared,

    /// The maintenance log was erased; carries the faults it held.
    MaintenanceCleared(u32),

    ChallengeAccepted { category: String, id: Uuid },

    /// User-facing refusal.
    ChallengeRejected(ChallengeError),

    ImageSaved(PathBuf),

    /// Safe-state cleanup ran; the controller has stopped.
    ShutdownComplete,
}
