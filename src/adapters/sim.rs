//! Simulated hardware and vision collaborators.
//!
//! Lets the binary run on a development machine with no GPIO, servos,
//! camera or model.  Input levels live in a shared [`SimPanel`] that an
//! operator console (or a test) flips from another thread.
//!
//! - [`SimHardware`]: [`SensorPort`] + [`ActuatorPort`]; actuator writes
//!   are logged and remembered.
//! - [`SimCamera`]: an endless stream of synthetic gradient frames.
//! - [`SimClassifier`]: deterministic labels cycled from a fixed list.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};

use crate::app::ports::{ActuatorPort, Classifier, FrameSource, SensorPort, ServoCommand};
use crate::config::ClassifierOptions;
use crate::control::gate::Category;
use crate::drivers::led::Rgb;
use crate::error::{ActuatorFault, CameraError, LedZone, SensorError, ServoId};
use crate::events::EdgeNotifier;
use crate::frame::Frame;
use crate::sensors::{BeamId, InputPin, SensorSource};

// ───────────────────────────────────────────────────────────────
// Shared input panel
// ───────────────────────────────────────────────────────────────

/// "Condition present" per input: motion seen, beam occluded.
#[derive(Default)]
pub struct SimPanel {
    active: [AtomicBool; SensorSource::COUNT],
}

impl SimPanel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, source: SensorSource, active: bool) {
        self.active[source.index()].store(active, Ordering::Release);
    }

    pub fn toggle(&self, source: SensorSource) -> bool {
        !self.active[source.index()].fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_set(&self, source: SensorSource) -> bool {
        self.active[source.index()].load(Ordering::Acquire)
    }
}

fn source_of(pin: InputPin) -> SensorSource {
    match pin {
        InputPin::Motion => SensorSource::Motion,
        InputPin::Beam(beam) => SensorSource::Beam(beam),
    }
}

// ───────────────────────────────────────────────────────────────
// SimHardware
// ───────────────────────────────────────────────────────────────

pub struct SimHardware {
    panel: Arc<SimPanel>,
    last_active: [bool; SensorSource::COUNT],
    pending: [Option<Rgb>; 2],
    shown: [Rgb; 2],
}

impl SimHardware {
    pub fn new(panel: Arc<SimPanel>) -> Self {
        Self {
            panel,
            last_active: [false; SensorSource::COUNT],
            pending: [None; 2],
            shown: [(0, 0, 0); 2],
        }
    }

    /// Colour currently latched on `zone`.
    pub fn shown(&self, zone: LedZone) -> Rgb {
        self.shown[zone_index(zone)]
    }
}

fn zone_index(zone: LedZone) -> usize {
    match zone {
        LedZone::Interior => 0,
        LedZone::Status => 1,
    }
}

impl SensorPort for SimHardware {
    fn read_pin(&mut self, pin: InputPin) -> Result<bool, SensorError> {
        let active = self.panel.is_set(source_of(pin));
        // Report the raw level the real wiring would produce.
        Ok(match pin {
            InputPin::Motion => active,
            InputPin::Beam(_) => !active,
        })
    }

    fn poll_edges(&mut self, now_ms: u64, notifier: &EdgeNotifier) {
        let sources = core::iter::once(SensorSource::Motion)
            .chain(BeamId::ALL.into_iter().map(SensorSource::Beam));
        for source in sources {
            let active = self.panel.is_set(source);
            if active && !self.last_active[source.index()] {
                notifier.notify(source, now_ms);
            }
            self.last_active[source.index()] = active;
        }
    }
}

impl ActuatorPort for SimHardware {
    fn set_servo(&mut self, servo: ServoId, command: ServoCommand) -> Result<(), ActuatorFault> {
        match command {
            ServoCommand::Position(p) => info!("[sim] {} servo -> {:+.2}", servo, p),
            ServoCommand::Release => debug!("[sim] {} servo released", servo),
        }
        Ok(())
    }

    fn set_pixel_range(&mut self, zone: LedZone, colour: Rgb) -> Result<(), ActuatorFault> {
        self.pending[zone_index(zone)] = Some(colour);
        Ok(())
    }

    fn flush(&mut self, zone: LedZone) -> Result<(), ActuatorFault> {
        let idx = zone_index(zone);
        if let Some(colour) = self.pending[idx].take() {
            self.shown[idx] = colour;
            info!("[sim] {} LEDs = {:?}", zone, colour);
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// SimCamera
// ───────────────────────────────────────────────────────────────

pub struct SimCamera {
    width: u32,
    height: u32,
    frames: u64,
}

impl SimCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: 0,
        }
    }
}

impl FrameSource for SimCamera {
    fn next_frame(&mut self, _budget: Duration) -> Result<Frame, CameraError> {
        self.frames += 1;
        let seed = self.frames as u8;
        let (w, h) = (self.width as usize, self.height as usize);
        let mut pixels = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                pixels.push((x as u8).wrapping_add(seed));
                pixels.push((y as u8).wrapping_mul(3));
                pixels.push(seed);
            }
        }
        Frame::from_rgb(self.width, self.height, self.frames, pixels).ok_or(CameraError::Disconnected)
    }
}

// ───────────────────────────────────────────────────────────────
// SimClassifier
// ───────────────────────────────────────────────────────────────

/// Labels the simulated model "recognises", in rotation.
pub const SIM_LABELS: [(&str, f32); 4] = [
    ("plastic_bottle", 0.82),
    ("nonRecyclable_food_waste", 0.95),
    ("aluminium_can", 0.55),
    ("cardboard", 0.71),
];

#[derive(Default)]
pub struct SimClassifier {
    calls: usize,
}

impl SimClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for SimClassifier {
    fn classify(&mut self, _frame: &Frame, options: &ClassifierOptions) -> Vec<Category> {
        let (name, score) = SIM_LABELS[self.calls % SIM_LABELS.len()];
        self.calls += 1;
        let runner_up = (score * 0.5).max(options.score_threshold);
        vec![
            Category::new(name, score),
            Category::new("unknown", runner_up),
        ]
    }
}
