//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the current time, the in-flight cycle's outcomes, the pending
//! [`Job`], and configuration.  Think of it as the "blackboard" in a
//! blackboard architecture.  The controller writes outcomes after doing
//! the I/O a job asked for; handlers only ever read them.

use crate::config::BinConfig;
use crate::control::gate::{ClassificationResult, DecisionKind, SortDecision};
use crate::drivers::led::LedColour;

// ---------------------------------------------------------------------------
// Jobs (written by state handlers; carried out by the controller)
// ---------------------------------------------------------------------------

/// I/O a handler needs done.  At most one is pending at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Paint the interior zone.
    Indicate(LedColour),
    /// Grab a frame and classify it.
    Capture,
    /// Run the choreography for a decision.
    Actuate(DecisionKind),
    /// Interior off, hand the decision to the challenge window.
    Cleanup,
    /// Drive every output to the safe state.
    SafeState,
}

// ---------------------------------------------------------------------------
// Outcomes (written by the controller; read by state handlers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Classified(ClassificationResult),
    /// No usable frame within the wait budget.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationOutcome {
    Completed { lock_engaged: bool },
    /// A write or beam read failed; outputs were driven safe.
    Faulted,
    /// The sequencer was busy and refused the request.  Actuating
    /// re-posts the job after a backoff.
    Refused,
    /// Interrupted by shutdown.
    Cancelled,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Controller clock, refreshed before every tick.
    pub now_ms: u64,
    /// Milliseconds since the current state was entered.
    pub ms_in_state: u64,

    // -- Inputs --
    /// A debounced motion trigger or manual activation is waiting.
    pub trigger_pending: bool,
    pub shutdown_requested: bool,
    /// An unrecoverable error (camera lost) occurred.
    pub fatal: bool,

    // -- Cycle data --
    pub capture_requested: bool,
    pub capture: Option<CaptureOutcome>,
    pub decision: Option<SortDecision>,
    pub actuation: Option<ActuationOutcome>,
    /// `Job::Actuate` posts for the current decision.
    pub actuation_attempts: u32,
    /// When the sequencer last refused the current decision.
    pub refused_at_ms: u64,

    // -- Output --
    pub job: Option<Job>,

    // -- Configuration --
    pub config: BinConfig,
}

impl FsmContext {
    pub fn new(config: BinConfig) -> Self {
        Self {
            now_ms: 0,
            ms_in_state: 0,
            trigger_pending: false,
            shutdown_requested: false,
            fatal: false,
            capture_requested: false,
            capture: None,
            decision: None,
            actuation: None,
            actuation_attempts: 0,
            refused_at_ms: 0,
            job: None,
            config,
        }
    }

    /// Shutdown requested or a fatal error seen.
    pub fn must_stop(&self) -> bool {
        self.shutdown_requested || self.fatal
    }

    /// Forget everything about the previous cycle.
    pub fn clear_cycle(&mut self) {
        self.capture_requested = false;
        self.capture = None;
        self.decision = None;
        self.actuation = None;
        self.actuation_attempts = 0;
        self.refused_at_ms = 0;
    }

    /// The last actuation ran its choreography to the end.
    pub fn actuation_completed(&self) -> bool {
        matches!(self.actuation, Some(ActuationOutcome::Completed { .. }))
    }
}
