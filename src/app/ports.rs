//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BinController (domain)
//! ```
//!
//! Driven adapters (GPIO, servos, LED strips, camera, classifier, image
//! stores, event sinks, storage) implement these traits.  The
//! [`BinController`](super::service::BinController) consumes them, so the
//! domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **SensorPort** returns raw pin levels; polarity lives in
//!   [`InputPin::is_active`](crate::sensors::InputPin::is_active).
//! - **ActuatorPort** writes are individually fallible so a sequence can
//!   abort at the exact failing step.
//! - **ConfigPort** implementations MUST validate before persisting.

use core::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{BinConfig, ClassifierOptions};
use crate::control::challenge::UploadTicket;
use crate::control::gate::Category;
use crate::drivers::led::Rgb;
use crate::events::EdgeNotifier;
use crate::error::{ActuatorFault, CameraError, LedZone, SensorError, ServoId};
use crate::frame::Frame;
use crate::sensors::InputPin;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to sample a digital input.
pub trait SensorPort {
    /// Raw level of `pin` (`true` = HIGH).
    fn read_pin(&mut self, pin: InputPin) -> Result<bool, SensorError>;

    /// Whether `pin` currently reports its condition (motion, occlusion).
    fn is_active(&mut self, pin: InputPin) -> Result<bool, SensorError> {
        Ok(pin.is_active(self.read_pin(pin)?))
    }

    /// Report edges seen since the last call.
    ///
    /// Adapters with interrupt-driven edge callbacks push into the
    /// [`EdgeNotifier`] from the callback and keep this default.  Polled
    /// adapters compare levels here, once per control cycle.
    fn poll_edges(&mut self, _now_ms: u64, _notifier: &EdgeNotifier) {}
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// What to send to a servo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoCommand {
    /// Drive to a normalised position in [-1.0, 1.0] and hold.
    Position(f32),
    /// Stop pulsing: no holding torque.
    Release,
}

/// Write-side port: servos and LED strips.
pub trait ActuatorPort {
    fn set_servo(&mut self, servo: ServoId, command: ServoCommand) -> Result<(), ActuatorFault>;

    /// Paint every pixel in `zone` (not visible until [`flush`](Self::flush)).
    fn set_pixel_range(&mut self, zone: LedZone, colour: Rgb) -> Result<(), ActuatorFault>;

    /// Push the painted pixels of `zone` to the strip.
    fn flush(&mut self, zone: LedZone) -> Result<(), ActuatorFault>;
}

// ───────────────────────────────────────────────────────────────
// Time ports
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// A sleep was interrupted by a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Blocking delays for settle and dwell steps.
pub trait Sleeper {
    /// Sleep for `duration`, returning early with [`Cancelled`] once a
    /// shutdown has been requested.
    fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled>;

    /// Sleep for `duration` regardless of shutdown.  Reserved for the
    /// safe-state cleanup path.
    fn pause(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Vision collaborators
// ───────────────────────────────────────────────────────────────

/// The camera: an infinite, non-restartable stream of frames.
pub trait FrameSource {
    /// Next frame, waiting at most `budget`.
    fn next_frame(&mut self, budget: Duration) -> Result<Frame, CameraError>;
}

/// The external image classifier.  May return an empty list.
pub trait Classifier {
    fn classify(&mut self, frame: &Frame, options: &ClassifierOptions) -> Vec<Category>;
}

// ───────────────────────────────────────────────────────────────
// Persistence collaborators
// ───────────────────────────────────────────────────────────────

/// Local dataset capture of classified frames.
pub trait ImageStore {
    /// Save `frame` under `category`; returns the written path.
    fn save(&mut self, frame: &Frame, category: &str) -> Result<PathBuf, StoreError>;
}

/// Remote review queue for challenged classifications.
pub trait UploadSink {
    fn upload(&mut self, ticket: &UploadTicket) -> Result<(), UploadError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`BinEvent`](super::events::BinEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::BinEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST call [`BinConfig::validate`] before persisting and
/// after loading.
pub trait ConfigPort {
    /// Returns [`BinConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BinConfig, ConfigError>;

    fn save(&self, config: &BinConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ key-value store)
// ───────────────────────────────────────────────────────────────

/// Namespaced key-value storage for the maintenance log.
///
/// Write operations MUST be atomic: no partial values after power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
}

/// Errors from [`ImageStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The category name cannot be used as a directory.
    InvalidCategory,
    IoError,
}

/// Errors from [`UploadSink`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    Rejected,
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCategory => write!(f, "invalid category name"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "upload rejected"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
