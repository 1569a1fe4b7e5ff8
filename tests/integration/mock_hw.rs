//! Mock hardware and collaborators for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history, and drives time by hand so a ten-second watchdog runs in
//! microseconds.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use recycler::adapters::kv_store::MemoryStore;
use recycler::app::events::BinEvent;
use recycler::app::ports::{
    ActuatorPort, Cancelled, Classifier, Clock, EventSink, FrameSource, ImageStore, SensorPort,
    ServoCommand, Sleeper, StoreError, UploadError, UploadSink,
};
use recycler::app::service::{BinController, Collaborators};
use recycler::config::{BinConfig, ClassifierOptions};
use recycler::control::challenge::UploadTicket;
use recycler::control::gate::Category;
use recycler::drivers::led::{LedColour, Rgb};
use recycler::drivers::shutdown::ShutdownSignal;
use recycler::error::{ActuatorFault, CameraError, LedZone, SensorError, ServoId};
use recycler::frame::Frame;
use recycler::sensors::{BeamId, InputPin, SensorSource};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Servo(ServoId, ServoCommand),
    /// A zone flushed with this colour.
    Show(LedZone, Rgb),
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<HwCall>,
    /// Condition present per source (motion seen / beam occluded).
    pub active: [bool; SensorSource::COUNT],
    pub fail_reads: bool,
    pub fail_servo: Option<ServoId>,
    /// Flushing this colour to either zone fails.
    pub fail_led: Option<Rgb>,
    pending: [Option<Rgb>; 2],
}

fn zone_index(zone: LedZone) -> usize {
    match zone {
        LedZone::Interior => 0,
        LedZone::Status => 1,
    }
}

#[allow(dead_code)]
impl MockHardware {
    pub fn set_motion(&mut self, on: bool) {
        self.active[SensorSource::Motion.index()] = on;
    }

    pub fn set_beam(&mut self, beam: BeamId, occluded: bool) {
        self.active[SensorSource::Beam(beam).index()] = occluded;
    }

    /// Colours flushed to `zone`, oldest first.
    pub fn colours(&self, zone: LedZone) -> Vec<Rgb> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Show(z, rgb) if *z == zone => Some(*rgb),
                _ => None,
            })
            .collect()
    }

    pub fn last_colour(&self, zone: LedZone) -> Option<Rgb> {
        self.colours(zone).last().copied()
    }

    /// Positions commanded on `servo`, oldest first (releases skipped).
    pub fn positions(&self, servo: ServoId) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Servo(s, ServoCommand::Position(p)) if *s == servo => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Whether the last command to `servo` dropped its holding torque.
    pub fn released(&self, servo: ServoId) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::Servo(s, cmd) if *s == servo => Some(*cmd == ServoCommand::Release),
                _ => None,
            })
            .unwrap_or(true)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl SensorPort for MockHardware {
    fn read_pin(&mut self, pin: InputPin) -> Result<bool, SensorError> {
        if self.fail_reads {
            return Err(SensorError::GpioReadFailed(pin));
        }
        Ok(match pin {
            InputPin::Motion => self.active[SensorSource::Motion.index()],
            InputPin::Beam(beam) => !self.active[SensorSource::Beam(beam).index()],
        })
    }
}

impl ActuatorPort for MockHardware {
    fn set_servo(&mut self, servo: ServoId, command: ServoCommand) -> Result<(), ActuatorFault> {
        if self.fail_servo == Some(servo) {
            return Err(ActuatorFault::ServoWriteFailed(servo));
        }
        self.calls.push(HwCall::Servo(servo, command));
        Ok(())
    }

    fn set_pixel_range(&mut self, zone: LedZone, colour: Rgb) -> Result<(), ActuatorFault> {
        self.pending[zone_index(zone)] = Some(colour);
        Ok(())
    }

    fn flush(&mut self, zone: LedZone) -> Result<(), ActuatorFault> {
        if let Some(colour) = self.pending[zone_index(zone)].take() {
            if self.fail_led == Some(colour) {
                return Err(ActuatorFault::LedWriteFailed(zone));
            }
            self.calls.push(HwCall::Show(zone, colour));
        }
        Ok(())
    }
}

// ── ManualTime ────────────────────────────────────────────────

/// Clock that only moves when something sleeps or a test advances it.
pub struct ManualTime {
    pub now: u64,
    /// Request shutdown when a sleep reaches this time.
    pub cancel_at: Option<u64>,
    shutdown: ShutdownSignal,
}

#[allow(dead_code)]
impl ManualTime {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            now: 0,
            cancel_at: None,
            shutdown,
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl Clock for ManualTime {
    fn now_ms(&self) -> u64 {
        self.now
    }
}

impl Sleeper for ManualTime {
    fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        if self.shutdown.is_requested() {
            return Err(Cancelled);
        }
        let wake = self.now + duration.as_millis() as u64;
        if let Some(at) = self.cancel_at.filter(|at| *at <= wake) {
            self.now = at.max(self.now);
            self.shutdown.request();
            return Err(Cancelled);
        }
        self.now = wake;
        Ok(())
    }

    fn pause(&mut self, duration: Duration) {
        self.now += duration.as_millis() as u64;
    }
}

// ── Scripted vision ───────────────────────────────────────────

/// Plays back scripted results, then synthesises distinct frames.
pub struct ScriptedCamera {
    script: VecDeque<Result<Frame, CameraError>>,
    produced: u8,
}

impl FrameSource for ScriptedCamera {
    fn next_frame(&mut self, _budget: Duration) -> Result<Frame, CameraError> {
        if let Some(next) = self.script.pop_front() {
            return next;
        }
        self.produced = self.produced.wrapping_add(1);
        Frame::from_rgb(2, 2, 0, vec![self.produced; 12]).ok_or(CameraError::Disconnected)
    }
}

/// Returns scripted category lists in order, then nothing.
pub struct ScriptedClassifier {
    script: VecDeque<Vec<Category>>,
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &Frame, _options: &ClassifierOptions) -> Vec<Category> {
        self.script.pop_front().unwrap_or_default()
    }
}

// ── Recording collaborators ───────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<BinEvent>>>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BinEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingImages {
    pub saved: Arc<Mutex<Vec<String>>>,
}

impl ImageStore for RecordingImages {
    fn save(&mut self, _frame: &Frame, category: &str) -> Result<PathBuf, StoreError> {
        let mut saved = self.saved.lock().unwrap();
        let path = PathBuf::from(category).join(format!("{}.ppm", saved.len()));
        saved.push(category.to_string());
        Ok(path)
    }
}

#[derive(Clone, Default)]
pub struct RecordingUploads {
    pub tickets: Arc<Mutex<Vec<UploadTicket>>>,
    pub fail: Arc<AtomicBool>,
}

impl UploadSink for RecordingUploads {
    fn upload(&mut self, ticket: &UploadTicket) -> Result<(), UploadError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::IoError);
        }
        self.tickets.lock().unwrap().push(ticket.clone());
        Ok(())
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub ctrl: BinController<MockHardware, ManualTime>,
    pub sink: RecordingSink,
    pub images: RecordingImages,
    pub uploads: RecordingUploads,
    pub shutdown: ShutdownSignal,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(
        config: BinConfig,
        frames: Vec<Result<Frame, CameraError>>,
        results: Vec<Vec<Category>>,
    ) -> Self {
        let shutdown = ShutdownSignal::new();
        let sink = RecordingSink::default();
        let images = RecordingImages::default();
        let uploads = RecordingUploads::default();
        let io = Collaborators {
            camera: Box::new(ScriptedCamera {
                script: frames.into(),
                produced: 0,
            }),
            classifier: Box::new(ScriptedClassifier {
                script: results.into(),
            }),
            images: Box::new(images.clone()),
            uploads: Box::new(uploads.clone()),
            events: Box::new(sink.clone()),
            storage: Box::new(MemoryStore::new()),
        };
        let ctrl = BinController::new(
            config,
            MockHardware::default(),
            ManualTime::new(shutdown.clone()),
            io,
            shutdown.clone(),
        )
        .expect("valid config");
        Self {
            ctrl,
            sink,
            images,
            uploads,
            shutdown,
        }
    }

    /// Started controller whose classifier answers `results` in turn.
    pub fn started(results: Vec<Vec<Category>>) -> Self {
        let mut h = Self::new(BinConfig::default(), Vec::new(), results);
        h.ctrl.start();
        h
    }

    pub fn now(&self) -> u64 {
        self.ctrl.time().now
    }

    pub fn hw(&mut self) -> &mut MockHardware {
        self.ctrl.hardware_mut()
    }

    /// Tick every poll interval for `ms` of controller time.
    pub fn run_for(&mut self, ms: u64) {
        let poll = BinConfig::default().poll_interval_ms;
        let until = self.now() + ms;
        while self.now() < until && !self.ctrl.is_finished() {
            self.ctrl.tick();
            self.ctrl.time_mut().advance(poll);
        }
    }

    /// Press "activate" and run one full cycle back to Idle.
    pub fn sort_one(&mut self) {
        self.ctrl
            .requests()
            .push_event(recycler::app::commands::ControlRequest::Activate);
        self.run_for(12_000);
    }

    /// Deliver an edge from `source` stamped with the current time.
    pub fn edge(&mut self, source: SensorSource) {
        let now = self.now();
        self.ctrl.edge_notifier().notify(source, now);
    }

    pub fn events(&self) -> Vec<BinEvent> {
        self.sink.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&BinEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

pub fn category(name: &str, score: f32) -> Category {
    Category::new(name, score)
}

#[allow(dead_code)]
pub fn rgb(colour: LedColour) -> Rgb {
    colour.rgb()
}
