//! Actuator sequencer: the single owner of the physical outputs.
//!
//! Every servo move and LED change goes through here, one choreography at
//! a time.  A sequence is a short list of [`Step`]s executed in order:
//!
//! ```text
//!  Recycle:  selector→recycle ─settle─ release
//!            ├─ lock-check beam occluded? ─▶ lock engage ─settle─ release, status red
//!            selector→centre ─settle─ release
//!            interior green ─dwell─
//!
//!  Reject:   interior red
//!            selector→reject ─settle─ release
//!            ├─ lock-check beam occluded? ─▶ (as above)
//!            ─settle─ selector→centre ─settle─ release
//!            ─dwell─
//! ```
//!
//! Exclusivity is a claim on an `AtomicBool`: a second request while a
//! sequence runs fails immediately with [`SequenceError::Busy`] and never
//! queues.  Any failed write or cancelled sleep drives the safe state
//! before the error is returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::{ActuatorPort, SensorPort, ServoCommand, Sleeper};
use crate::config::{BinConfig, ServoPositions};
use crate::control::gate::DecisionKind;
use crate::drivers::led::LedColour;
use crate::error::{ActuatorFault, LedZone, SequenceError, ServoId};
use crate::sensors::{BeamId, InputPin};

/// Maximum steps in any choreography.
const MAX_STEPS: usize = 8;

/// Named choreographies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    Recycle,
    Reject,
    /// Engage the door lock and show the status zone red.
    Lock,
    /// Release the door lock and clear the status zone.
    Unlock,
    /// Startup: selector centred, lock released, interior idle.
    Home,
}

impl From<DecisionKind> for SequenceKind {
    fn from(kind: DecisionKind) -> Self {
        match kind {
            DecisionKind::Recycle => Self::Recycle,
            DecisionKind::Reject => Self::Reject,
        }
    }
}

/// One primitive action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Led { zone: LedZone, colour: LedColour },
    /// Drive to `position`, wait `settle`, then drop holding torque.
    Move {
        servo: ServoId,
        position: f32,
        settle: Duration,
    },
    /// Engage the lock if `beam` is occluded right now.
    LockIfOccluded { beam: BeamId },
    Dwell(Duration),
}

/// Where the door lock was last driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPosition {
    #[default]
    Unknown,
    Engaged,
    Released,
}

/// Last commanded state of every output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    /// Normalised selector position, `None` until first commanded.
    pub selector_position: Option<f32>,
    pub selector_holding: bool,
    pub lock: LockPosition,
    pub lock_holding: bool,
    pub interior: LedColour,
    pub status: LedColour,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self {
            selector_position: None,
            selector_holding: false,
            lock: LockPosition::Unknown,
            lock_holding: false,
            interior: LedColour::Off,
            status: LedColour::Off,
        }
    }
}

/// Outcome of a completed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceReport {
    pub kind: SequenceKind,
    /// The lock-check beam was occluded and the door was locked.
    pub lock_engaged: bool,
}

/// Proof of exclusive access.  Dropping it frees the sequencer.
#[must_use = "the sequencer is released as soon as the claim is dropped"]
pub struct SequenceClaim {
    busy: Arc<AtomicBool>,
}

impl Drop for SequenceClaim {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct ActuatorSequencer {
    positions: ServoPositions,
    servo_settle: Duration,
    lock_settle: Duration,
    recycle_display: Duration,
    reject_display: Duration,
    lock_check_beam: BeamId,
    busy: Arc<AtomicBool>,
    state: ActuatorState,
}

impl ActuatorSequencer {
    pub fn new(config: &BinConfig) -> Self {
        Self {
            positions: config.servo,
            servo_settle: Duration::from_millis(config.servo_settle_ms),
            lock_settle: Duration::from_millis(config.lock_settle_ms),
            recycle_display: Duration::from_millis(config.recycle_display_ms),
            reject_display: Duration::from_millis(config.reject_display_ms),
            lock_check_beam: config.lock_check_beam,
            busy: Arc::new(AtomicBool::new(false)),
            state: ActuatorState::default(),
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Try to take exclusive access.  `None` if a sequence is running.
    pub fn claim(&self) -> Option<SequenceClaim> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SequenceClaim {
                busy: self.busy.clone(),
            })
    }

    /// Shared handle on the busy flag (for status reporting off-thread).
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }

    /// The step list for `kind`.
    pub fn choreography(&self, kind: SequenceKind) -> heapless::Vec<Step, MAX_STEPS> {
        let p = &self.positions;
        let mut steps = heapless::Vec::new();
        let list: &[Step] = match kind {
            SequenceKind::Recycle => &[
                Step::Move {
                    servo: ServoId::Selector,
                    position: p.selector_recycle,
                    settle: self.servo_settle,
                },
                Step::LockIfOccluded {
                    beam: self.lock_check_beam,
                },
                Step::Move {
                    servo: ServoId::Selector,
                    position: p.selector_center,
                    settle: self.servo_settle,
                },
                Step::Led {
                    zone: LedZone::Interior,
                    colour: LedColour::Accepted,
                },
                Step::Dwell(self.recycle_display),
            ],
            SequenceKind::Reject => &[
                Step::Led {
                    zone: LedZone::Interior,
                    colour: LedColour::Rejected,
                },
                Step::Move {
                    servo: ServoId::Selector,
                    position: p.selector_reject,
                    settle: self.servo_settle,
                },
                Step::LockIfOccluded {
                    beam: self.lock_check_beam,
                },
                Step::Dwell(self.servo_settle),
                Step::Move {
                    servo: ServoId::Selector,
                    position: p.selector_center,
                    settle: self.servo_settle,
                },
                Step::Dwell(self.reject_display),
            ],
            SequenceKind::Lock => &[
                Step::Move {
                    servo: ServoId::Lock,
                    position: p.lock_engaged,
                    settle: self.lock_settle,
                },
                Step::Led {
                    zone: LedZone::Status,
                    colour: LedColour::Locked,
                },
            ],
            SequenceKind::Unlock => &[
                Step::Move {
                    servo: ServoId::Lock,
                    position: p.lock_released,
                    settle: self.lock_settle,
                },
                Step::Led {
                    zone: LedZone::Status,
                    colour: LedColour::Off,
                },
            ],
            SequenceKind::Home => &[
                Step::Led {
                    zone: LedZone::Status,
                    colour: LedColour::Off,
                },
                Step::Move {
                    servo: ServoId::Selector,
                    position: p.selector_center,
                    settle: self.servo_settle,
                },
                Step::Move {
                    servo: ServoId::Lock,
                    position: p.lock_released,
                    settle: self.lock_settle,
                },
                Step::Led {
                    zone: LedZone::Interior,
                    colour: LedColour::Idle,
                },
            ],
        };
        // Every list above is shorter than MAX_STEPS.
        let _ = steps.extend_from_slice(list);
        steps
    }

    /// Run a full choreography to completion.
    ///
    /// Fails fast with `Busy` if another sequence holds the claim.  On any
    /// other error the safe state has already been driven.
    pub fn run_sequence<H, S>(
        &mut self,
        kind: SequenceKind,
        hw: &mut H,
        sleeper: &mut S,
    ) -> Result<SequenceReport, SequenceError>
    where
        H: SensorPort + ActuatorPort,
        S: Sleeper,
    {
        let Some(claim) = self.claim() else {
            warn!("Sequence {:?} refused: actuators busy", kind);
            return Err(SequenceError::Busy);
        };
        debug!("Sequence {:?} started", kind);

        let mut report = SequenceReport {
            kind,
            lock_engaged: false,
        };
        for step in self.choreography(kind) {
            if let Err(e) = self.execute(step, hw, sleeper, &mut report) {
                match e {
                    SequenceError::Cancelled => info!("Sequence {:?} cancelled", kind),
                    _ => error!("Sequence {:?} aborted at {:?}: {}", kind, step, e),
                }
                if let Err(fault) = self.drive_safe(hw, sleeper) {
                    error!("Safe state incomplete after abort: {}", fault);
                }
                drop(claim);
                return Err(e);
            }
        }

        drop(claim);
        debug!("Sequence {:?} complete", kind);
        Ok(report)
    }

    /// Paint one LED zone outside a choreography.  No write when the zone
    /// already shows `colour`.
    pub fn show<H: ActuatorPort>(
        &mut self,
        zone: LedZone,
        colour: LedColour,
        hw: &mut H,
    ) -> Result<(), SequenceError> {
        let _claim = self.claim().ok_or(SequenceError::Busy)?;
        let current = match zone {
            LedZone::Interior => self.state.interior,
            LedZone::Status => self.state.status,
        };
        if current != colour {
            self.paint(hw, zone, colour)?;
        }
        Ok(())
    }

    /// Drive the safe state: selector centred, door locked, both servos
    /// released, LEDs off.
    ///
    /// Best effort: every step is attempted even if an earlier one fails,
    /// and shutdown does not interrupt it.  Skips entirely when the outputs
    /// are already safe.
    pub fn force_safe<H, S>(&mut self, hw: &mut H, sleeper: &mut S) -> Result<(), ActuatorFault>
    where
        H: ActuatorPort,
        S: Sleeper,
    {
        let claim = self.claim();
        if claim.is_none() {
            warn!("Safe state forced while a sequence holds the actuators");
        }
        let result = self.drive_safe(hw, sleeper);
        drop(claim);
        result
    }

    pub fn is_safe(&self) -> bool {
        let s = &self.state;
        s.selector_position == Some(self.positions.selector_center)
            && !s.selector_holding
            && s.lock == LockPosition::Engaged
            && !s.lock_holding
            && s.interior == LedColour::Off
            && s.status == LedColour::Off
    }

    // ── Internals ────────────────────────────────────────────────

    fn execute<H, S>(
        &mut self,
        step: Step,
        hw: &mut H,
        sleeper: &mut S,
        report: &mut SequenceReport,
    ) -> Result<(), SequenceError>
    where
        H: SensorPort + ActuatorPort,
        S: Sleeper,
    {
        match step {
            Step::Led { zone, colour } => self.paint(hw, zone, colour)?,
            Step::Move {
                servo,
                position,
                settle,
            } => {
                self.drive(hw, servo, position)?;
                sleeper.sleep(settle).map_err(|_| SequenceError::Cancelled)?;
                self.release(hw, servo)?;
            }
            Step::LockIfOccluded { beam } => {
                let occluded = hw
                    .is_active(InputPin::Beam(beam))
                    .map_err(|_| ActuatorFault::SensorIo(beam))?;
                if occluded {
                    warn!("{} occluded after routing; locking door", beam);
                    for lock_step in self.choreography(SequenceKind::Lock) {
                        self.execute(lock_step, hw, sleeper, report)?;
                    }
                    report.lock_engaged = true;
                }
            }
            Step::Dwell(d) => sleeper.sleep(d).map_err(|_| SequenceError::Cancelled)?,
        }
        Ok(())
    }

    fn drive<H: ActuatorPort>(
        &mut self,
        hw: &mut H,
        servo: ServoId,
        position: f32,
    ) -> Result<(), ActuatorFault> {
        hw.set_servo(servo, ServoCommand::Position(position))?;
        match servo {
            ServoId::Selector => {
                self.state.selector_position = Some(position);
                self.state.selector_holding = true;
            }
            ServoId::Lock => {
                self.state.lock = if position == self.positions.lock_engaged {
                    LockPosition::Engaged
                } else if position == self.positions.lock_released {
                    LockPosition::Released
                } else {
                    LockPosition::Unknown
                };
                self.state.lock_holding = true;
            }
        }
        Ok(())
    }

    fn release<H: ActuatorPort>(&mut self, hw: &mut H, servo: ServoId) -> Result<(), ActuatorFault> {
        hw.set_servo(servo, ServoCommand::Release)?;
        match servo {
            ServoId::Selector => self.state.selector_holding = false,
            ServoId::Lock => self.state.lock_holding = false,
        }
        Ok(())
    }

    fn paint<H: ActuatorPort>(
        &mut self,
        hw: &mut H,
        zone: LedZone,
        colour: LedColour,
    ) -> Result<(), ActuatorFault> {
        hw.set_pixel_range(zone, colour.rgb())?;
        hw.flush(zone)?;
        match zone {
            LedZone::Interior => self.state.interior = colour,
            LedZone::Status => self.state.status = colour,
        }
        Ok(())
    }

    fn drive_safe<H, S>(&mut self, hw: &mut H, sleeper: &mut S) -> Result<(), ActuatorFault>
    where
        H: ActuatorPort,
        S: Sleeper,
    {
        if self.is_safe() {
            debug!("Outputs already safe");
            return Ok(());
        }
        warn!("Driving safe state");

        let mut first_fault = None;
        let mut note = |r: Result<(), ActuatorFault>| {
            if let Err(e) = r {
                error!("Safe state step failed: {}", e);
                first_fault.get_or_insert(e);
            }
        };

        let centre = self.positions.selector_center;
        note(self.drive(hw, ServoId::Selector, centre));
        sleeper.pause(self.servo_settle);
        note(self.release(hw, ServoId::Selector));

        let engaged = self.positions.lock_engaged;
        note(self.drive(hw, ServoId::Lock, engaged));
        sleeper.pause(self.lock_settle);
        note(self.release(hw, ServoId::Lock));

        note(self.paint(hw, LedZone::Interior, LedColour::Off));
        note(self.paint(hw, LedZone::Status, LedColour::Off));

        match first_fault {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
