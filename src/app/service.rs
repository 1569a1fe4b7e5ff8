//! Application service: the hexagonal core.
//!
//! [`BinController`] owns the FSM, the actuator sequencer, the break-beam
//! watchdog and the challenge window.  All I/O flows through port traits
//! injected at construction, making the whole controller testable with
//! mock adapters.
//!
//! ```text
//!  EdgeQueue ────▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  RequestQueue ─▶ │        BinController          │
//!  SensorPort ───▶ │ FSM · Sequencer · Watchdog   │ ──▶ ImageStore
//! ActuatorPort ◀── │ Debouncer · ChallengeWindow  │ ──▶ UploadSink
//!  FrameSource ──▶ └──────────────────────────────┘ ──▶ StoragePort
//! ```
//!
//! One call to [`tick`](BinController::tick) is one control cycle:
//!
//! 1. refresh the clock and the shutdown flag
//! 2. drain edge notifications through the debouncer
//! 3. service due watchdog checks
//! 4. tick the FSM and carry out every [`Job`] it posts
//! 5. drain operator requests

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::BinConfig;
use crate::control::challenge::ChallengeWindow;
use crate::control::gate::{ClassificationResult, DecisionKind, SortDecision};
use crate::control::sequencer::{ActuatorSequencer, ActuatorState, LockPosition, SequenceKind};
use crate::diagnostics::{MaintenanceEntry, MaintenanceLog};
use crate::drivers::led::LedColour;
use crate::drivers::shutdown::ShutdownSignal;
use crate::error::{ActuatorFault, CameraError, ChallengeError, Error, LedZone, SequenceError};
use crate::events::{EdgeNotifier, EdgeQueue, RequestQueue};
use crate::frame::Frame;
use crate::fsm::context::{ActuationOutcome, CaptureOutcome, FsmContext, Job};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::safety::BreakBeamWatchdog;
use crate::sensors::{InputPin, SensorDebouncer, SensorEvent, SensorSource};

use super::commands::ControlRequest;
use super::events::BinEvent;
use super::ports::{
    ActuatorPort, Classifier, Clock, EventSink, FrameSource, ImageStore, SensorPort, Sleeper,
    StoragePort, UploadSink,
};

/// Upper bound on FSM steps per tick, so a misbehaving handler cannot spin.
const MAX_STEPS_PER_TICK: usize = 8;

/// Sort attempts against a busy sequencer before the item is abandoned.
/// At the default backoff this outlasts two full choreographies.
const MAX_ACTUATION_ATTEMPTS: u32 = 40;

/// The non-GPIO collaborators, boxed so adapters can be swapped at runtime.
pub struct Collaborators {
    pub camera: Box<dyn FrameSource>,
    pub classifier: Box<dyn Classifier>,
    pub images: Box<dyn ImageStore>,
    pub uploads: Box<dyn UploadSink>,
    pub events: Box<dyn EventSink>,
    pub storage: Box<dyn StoragePort>,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct BinStatus {
    pub state: StateId,
    /// Sort sequences run to completion.
    pub cycles: u64,
    /// Faults recorded in the maintenance log since it was last cleared.
    pub faults: u32,
    pub last_decision: Option<SortDecision>,
    pub lock_engaged: bool,
    pub actuators: ActuatorState,
    pub armed_watchdogs: usize,
}

// ───────────────────────────────────────────────────────────────
// BinController
// ───────────────────────────────────────────────────────────────

/// Top-level controller for one bin.
///
/// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`], which
/// lets a sequence read a beam between two servo moves without a double
/// mutable borrow.  `time` likewise provides both the clock and the
/// cancellable sleeps.
pub struct BinController<H, T>
where
    H: SensorPort + ActuatorPort,
    T: Clock + Sleeper,
{
    fsm: Fsm,
    ctx: FsmContext,
    debouncer: SensorDebouncer,
    sequencer: ActuatorSequencer,
    watchdog: BreakBeamWatchdog,
    challenges: ChallengeWindow,
    maintenance: MaintenanceLog,
    edges: Arc<EdgeQueue>,
    requests: Arc<RequestQueue>,
    notifier: EdgeNotifier,
    shutdown: ShutdownSignal,
    hw: H,
    time: T,
    io: Collaborators,
    /// Frame behind the in-flight decision.
    frame: Option<Frame>,
    cycles: u64,
    started: bool,
    finished: bool,
    fatal: Option<CameraError>,
}

impl<H, T> BinController<H, T>
where
    H: SensorPort + ActuatorPort,
    T: Clock + Sleeper,
{
    /// Construct the controller.  Validates `config`.
    ///
    /// Does **not** touch the hardware: call [`start`](Self::start) or
    /// [`run`](Self::run) next.
    pub fn new(
        config: BinConfig,
        hw: H,
        time: T,
        io: Collaborators,
        shutdown: ShutdownSignal,
    ) -> Result<Self, Error> {
        config.validate()?;

        let edges = Arc::new(EdgeQueue::new());
        let notifier = EdgeNotifier::new(edges.clone());

        Ok(Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            debouncer: SensorDebouncer::from_config(&config),
            sequencer: ActuatorSequencer::new(&config),
            watchdog: BreakBeamWatchdog::from_config(&config),
            challenges: ChallengeWindow::new(config.challenge_window_ms),
            maintenance: MaintenanceLog::new(),
            ctx: FsmContext::new(config),
            edges,
            requests: Arc::new(RequestQueue::new()),
            notifier,
            shutdown,
            hw,
            time,
            io,
            frame: None,
            cycles: 0,
            started: false,
            finished: false,
            fatal: None,
        })
    }

    /// Handle for GPIO edge callbacks.
    pub fn edge_notifier(&self) -> EdgeNotifier {
        self.notifier.clone()
    }

    /// Queue for operator requests; push from any thread.
    pub fn requests(&self) -> Arc<RequestQueue> {
        self.requests.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the maintenance log, home the actuators and enter Idle.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.refresh();
        self.maintenance.init(self.io.storage.as_ref());
        if self.maintenance.count() > 0 {
            warn!(
                "Bin flagged for maintenance: {} fault(s) on record",
                self.maintenance.count()
            );
        }

        info!("Homing actuators");
        match self
            .sequencer
            .run_sequence(SequenceKind::Home, &mut self.hw, &mut self.time)
        {
            Ok(_) => {}
            Err(SequenceError::Fault(fault)) => self.on_actuator_fault(fault),
            Err(e) => warn!("Homing incomplete: {}", e),
        }

        self.refresh();
        self.fsm.start(&mut self.ctx);
        self.run_pending_job();
        self.started = true;

        let state = self.fsm.current_state();
        self.io.events.emit(&BinEvent::Started(state));
        info!("BinController started in {:?}", state);
    }

    /// Run one full control cycle.
    pub fn tick(&mut self) {
        if !self.started {
            self.start();
        }
        if self.finished {
            return;
        }
        self.refresh();

        if !self.ctx.must_stop() {
            self.hw.poll_edges(self.ctx.now_ms, &self.notifier);
            self.process_edges();
            self.service_watchdog();
        }

        self.step_fsm();

        if !self.finished {
            self.process_requests();
        }
    }

    /// Tick until shutdown or a fatal error, sleeping `poll_interval_ms`
    /// between cycles.  The safe state has been driven when this returns.
    pub fn run(&mut self) -> Result<(), Error> {
        self.start();
        let poll = Duration::from_millis(self.ctx.config.poll_interval_ms);

        while !self.finished {
            self.tick();
            if self.finished {
                break;
            }
            if self.time.sleep(poll).is_err() {
                debug!("Poll sleep interrupted by shutdown");
            }
        }

        match self.fatal {
            Some(e) => Err(Error::Camera(e)),
            None => Ok(()),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn status(&self) -> BinStatus {
        let actuators = self.sequencer.state();
        BinStatus {
            state: self.fsm.current_state(),
            cycles: self.cycles,
            faults: self.maintenance.count(),
            last_decision: self.challenges.last_decision().cloned(),
            lock_engaged: actuators.lock == LockPosition::Engaged,
            actuators,
            armed_watchdogs: self.watchdog.armed_count(),
        }
    }

    pub fn maintenance_count(&self) -> u32 {
        self.maintenance.count()
    }

    pub fn maintenance_entries(&self) -> heapless::Vec<MaintenanceEntry, 4> {
        self.maintenance.read_all(self.io.storage.as_ref())
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut T {
        &mut self.time
    }

    pub fn sequencer(&self) -> &ActuatorSequencer {
        &self.sequencer
    }

    pub fn watchdog(&self) -> &BreakBeamWatchdog {
        &self.watchdog
    }

    pub fn challenge_window(&self) -> &ChallengeWindow {
        &self.challenges
    }

    // ── Internal: inputs ──────────────────────────────────────

    fn refresh(&mut self) {
        self.ctx.now_ms = self.time.now_ms();
        self.ctx.shutdown_requested = self.shutdown.is_requested();
    }

    fn process_edges(&mut self) {
        let edges = self.edges.clone();
        edges.drain_events(|event| self.handle_edge(event));
    }

    fn handle_edge(&mut self, event: SensorEvent) {
        let active = match self.hw.is_active(event.source.pin()) {
            Ok(active) => active,
            Err(e) => {
                warn!("{} edge dropped: {}", event.source, e);
                if self.fsm.current_state().in_cycle() {
                    self.abort_cycle("sensor read failed");
                }
                return;
            }
        };

        let Some(trigger) = self
            .debouncer
            .accept(event.source, event.timestamp_ms, active)
        else {
            return;
        };

        match trigger.source {
            SensorSource::Motion => {
                if self.fsm.current_state() == StateId::Idle {
                    info!("Motion at {}ms", trigger.timestamp_ms);
                    self.ctx.trigger_pending = true;
                } else {
                    debug!(
                        "Motion ignored in {:?}",
                        self.fsm.current_state()
                    );
                }
            }
            SensorSource::Beam(beam) => self.watchdog.arm(beam, trigger.timestamp_ms),
        }
    }

    /// Re-read each beam whose confirm delay has passed; lock on a jam.
    fn service_watchdog(&mut self) {
        let now = self.ctx.now_ms;
        for timer in self.watchdog.poll_due(now) {
            let beam = timer.beam;
            let occluded = match self.hw.is_active(InputPin::Beam(beam)) {
                Ok(occluded) => occluded,
                Err(e) => {
                    warn!("{} confirm read failed: {}", beam, e);
                    continue;
                }
            };
            if !occluded {
                debug!("{} clear at confirm", beam);
                continue;
            }
            if self.sequencer.state().lock == LockPosition::Engaged {
                info!("{} still blocked; door already locked", beam);
                continue;
            }

            warn!(
                "{} blocked for {}ms; locking door",
                beam,
                now.saturating_sub(timer.armed_at_ms)
            );
            match self
                .sequencer
                .run_sequence(SequenceKind::Lock, &mut self.hw, &mut self.time)
            {
                Ok(_) => self.io.events.emit(&BinEvent::JamLockEngaged(beam)),
                Err(SequenceError::Busy) => {
                    self.watchdog.retry(timer, now);
                }
                Err(SequenceError::Fault(fault)) => self.on_actuator_fault(fault),
                Err(SequenceError::Cancelled) => {}
            }
        }
    }

    fn process_requests(&mut self) {
        while let Some(request) = self.requests.pop_event() {
            debug!("Request: {:?}", request);
            match request {
                ControlRequest::Activate => {
                    if self.fsm.current_state() == StateId::Idle && !self.ctx.must_stop() {
                        info!("Manual activation");
                        self.ctx.trigger_pending = true;
                    } else {
                        debug!("Activation ignored in {:?}", self.fsm.current_state());
                    }
                }
                ControlRequest::Challenge { at_ms } => self.handle_challenge(at_ms),
                ControlRequest::ClearLock => self.clear_lock(),
                ControlRequest::ResetMaintenance => {
                    let faults = self.maintenance.count();
                    self.maintenance.clear(self.io.storage.as_mut());
                    info!("Maintenance log cleared ({} fault(s))", faults);
                    self.io.events.emit(&BinEvent::MaintenanceCleared(faults));
                }
            }
        }
    }

    fn handle_challenge(&mut self, at_ms: u64) {
        let ticket = match self.challenges.challenge(at_ms) {
            Ok(ticket) => ticket,
            Err(e) => {
                info!("Challenge refused: {}", e);
                self.io.events.emit(&BinEvent::ChallengeRejected(e));
                return;
            }
        };

        match self.io.uploads.upload(&ticket) {
            Ok(()) => self.io.events.emit(&BinEvent::ChallengeAccepted {
                category: ticket.category_name.clone(),
                id: ticket.generated_id,
            }),
            Err(e) => {
                warn!("Challenge {} upload failed: {}", ticket, e);
                self.challenges.revoke(&ticket);
                self.io
                    .events
                    .emit(&BinEvent::ChallengeRejected(ChallengeError::UploadFailed));
            }
        }
    }

    fn clear_lock(&mut self) {
        info!("Clearing door lock");
        match self
            .sequencer
            .run_sequence(SequenceKind::Unlock, &mut self.hw, &mut self.time)
        {
            Ok(_) => self.io.events.emit(&BinEvent::LockCleared),
            Err(SequenceError::Busy) => warn!("Lock not cleared: actuators busy"),
            Err(SequenceError::Fault(fault)) => self.on_actuator_fault(fault),
            Err(SequenceError::Cancelled) => {}
        }
    }

    // ── Internal: FSM and jobs ────────────────────────────────

    fn step_fsm(&mut self) {
        for _ in 0..MAX_STEPS_PER_TICK {
            let before = self.fsm.current_state();
            self.fsm.tick(&mut self.ctx);
            self.note_transition(before);

            if self.ctx.job.is_some() {
                self.run_pending_job();
            } else if self.fsm.current_state() == before {
                return;
            }
            if self.finished {
                return;
            }
        }
    }

    fn run_pending_job(&mut self) {
        if let Some(job) = self.ctx.job.take() {
            self.run_job(job);
            self.refresh();
        }
    }

    fn run_job(&mut self, job: Job) {
        match job {
            Job::Indicate(colour) => self.show_interior(colour),
            Job::Capture => self.capture(),
            Job::Actuate(kind) => {
                self.ctx.actuation_attempts += 1;
                if self.ctx.actuation_attempts == 1 {
                    if let Some(decision) = &self.ctx.decision {
                        self.io.events.emit(&BinEvent::Decided(decision.clone()));
                    }
                }
                let route = match kind {
                    DecisionKind::Recycle => self.ctx.config.recycle_route_beam,
                    DecisionKind::Reject => self.ctx.config.reject_route_beam,
                };
                if let Some(beam) = route.filter(|_| !self.sequencer.is_busy()) {
                    self.watchdog.arm(beam, self.ctx.now_ms);
                }

                let outcome = match self.sequencer.run_sequence(
                    SequenceKind::from(kind),
                    &mut self.hw,
                    &mut self.time,
                ) {
                    Ok(report) => {
                        self.cycles += 1;
                        self.io.events.emit(&BinEvent::SequenceCompleted {
                            kind: report.kind,
                            lock_engaged: report.lock_engaged,
                        });
                        if report.lock_engaged {
                            self.io.events.emit(&BinEvent::JamLockEngaged(
                                self.ctx.config.lock_check_beam,
                            ));
                        }
                        ActuationOutcome::Completed {
                            lock_engaged: report.lock_engaged,
                        }
                    }
                    Err(SequenceError::Busy) => self.on_actuation_refused(kind),
                    Err(SequenceError::Cancelled) => ActuationOutcome::Cancelled,
                    Err(SequenceError::Fault(fault)) => {
                        self.on_actuator_fault(fault);
                        ActuationOutcome::Faulted
                    }
                };
                self.ctx.actuation = Some(outcome);
            }
            Job::Cleanup => {
                self.show_interior(LedColour::Off);
                if let (Some(decision), Some(frame)) = (self.ctx.decision.clone(), self.frame.take())
                {
                    if self.ctx.config.save_images && decision.is_recyclable {
                        match self.io.images.save(&frame, &decision.category_name) {
                            Ok(path) => self.io.events.emit(&BinEvent::ImageSaved(path)),
                            Err(e) => warn!("Image not saved: {}", e),
                        }
                    }
                    if self.ctx.actuation_completed() {
                        self.challenges.record(decision, frame);
                    } else {
                        debug!("'{}' was never routed; not challengeable", decision.category_name);
                    }
                }
            }
            Job::SafeState => {
                if let Err(fault) = self.sequencer.force_safe(&mut self.hw, &mut self.time) {
                    self.on_actuator_fault(fault);
                }
                self.watchdog.cancel_all();
                self.finished = true;
                self.io.events.emit(&BinEvent::ShutdownComplete);
                info!("Shutdown complete after {} cycle(s)", self.cycles);
            }
        }
    }

    fn capture(&mut self) {
        let budget = Duration::from_millis(self.ctx.config.frame_wait_budget_ms);
        match self.io.camera.next_frame(budget) {
            Ok(frame) => {
                let frame = if self.ctx.config.mirror_frames {
                    frame.mirrored()
                } else {
                    frame
                };
                let options = &self.ctx.config.classifier;
                let categories = self.io.classifier.classify(&frame, options);
                let result = ClassificationResult::new(categories).filtered(options);
                debug!("Classified {} categories", result.categories.len());
                self.frame = Some(frame);
                self.ctx.capture = Some(CaptureOutcome::Classified(result));
            }
            Err(CameraError::Timeout) => {
                warn!("No frame within {}ms", budget.as_millis());
                self.ctx.capture = Some(CaptureOutcome::Aborted);
            }
            Err(e @ CameraError::Disconnected) => {
                error!("Camera lost: {}", e);
                self.fatal = Some(e);
                self.ctx.fatal = true;
                self.ctx.capture = Some(CaptureOutcome::Aborted);
            }
        }
    }

    /// The sequencer refused `kind`.  Actuating re-posts the job after a
    /// backoff until `MAX_ACTUATION_ATTEMPTS` is spent, then the sort is
    /// abandoned with the outputs driven safe.
    fn on_actuation_refused(&mut self, kind: DecisionKind) -> ActuationOutcome {
        let attempts = self.ctx.actuation_attempts;
        if attempts < MAX_ACTUATION_ATTEMPTS {
            debug!("{:?} refused: actuators busy (attempt {})", kind, attempts);
            self.ctx.refused_at_ms = self.ctx.now_ms;
            return ActuationOutcome::Refused;
        }

        error!("{:?} abandoned: actuators busy after {} attempts", kind, attempts);
        if let Err(e) = self.sequencer.force_safe(&mut self.hw, &mut self.time) {
            error!("Safe state incomplete: {}", e);
        }
        self.record_maintenance("actuators busy; sort abandoned");
        ActuationOutcome::Faulted
    }

    fn show_interior(&mut self, colour: LedColour) {
        match self.sequencer.show(LedZone::Interior, colour, &mut self.hw) {
            Ok(()) => {}
            Err(SequenceError::Fault(fault)) => {
                self.io.events.emit(&BinEvent::ActuatorFault(fault));
                if self.fsm.current_state().in_cycle() {
                    self.abort_cycle(&fault.to_string());
                } else {
                    error!("Actuator fault: {}", fault);
                    if let Err(e) = self.sequencer.force_safe(&mut self.hw, &mut self.time) {
                        error!("Safe state incomplete: {}", e);
                    }
                    self.record_maintenance(&fault.to_string());
                }
            }
            Err(e) => warn!("Interior LEDs not set to {:?}: {}", colour, e),
        }
    }

    /// Drive safe and fall through to CoolingDown.
    fn abort_cycle(&mut self, reason: &str) {
        error!("Cycle aborted: {}", reason);
        if let Err(e) = self.sequencer.force_safe(&mut self.hw, &mut self.time) {
            error!("Safe state incomplete: {}", e);
        }
        self.record_maintenance(reason);
        self.force_state(StateId::CoolingDown);
    }

    fn on_actuator_fault(&mut self, fault: ActuatorFault) {
        error!("Actuator fault: {}", fault);
        self.io.events.emit(&BinEvent::ActuatorFault(fault));
        let reason = fault.to_string();
        self.record_maintenance(&reason);
    }

    fn record_maintenance(&mut self, reason: &str) {
        let entry = MaintenanceEntry::new(self.ctx.now_ms, reason, self.cycles);
        self.maintenance.record(self.io.storage.as_mut(), &entry);
        warn!(
            "Bin flagged for maintenance ({} fault(s))",
            self.maintenance.count()
        );
    }

    fn force_state(&mut self, next: StateId) {
        let before = self.fsm.current_state();
        self.fsm.force_transition(next, &mut self.ctx);
        self.note_transition(before);
        self.run_pending_job();
    }

    fn note_transition(&mut self, before: StateId) {
        let after = self.fsm.current_state();
        if after != before {
            self.io.events.emit(&BinEvent::StateChanged {
                from: before,
                to: after,
            });
        }
    }
}

impl<H, T> Drop for BinController<H, T>
where
    H: SensorPort + ActuatorPort,
    T: Clock + Sleeper,
{
    fn drop(&mut self) {
        if self.started && !self.finished {
            warn!("BinController dropped while running; driving safe state");
            if let Err(e) = self.sequencer.force_safe(&mut self.hw, &mut self.time) {
                error!("Safe state incomplete on drop: {}", e);
            }
        }
    }
}
