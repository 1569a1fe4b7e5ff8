//! Unified error types for the bin controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform.  Leaf errors are `Copy`
//! so they can be passed through the sequencer and FSM context without
//! allocation.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::pins::gpio_for;
use crate::sensors::{BeamId, InputPin};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor pin could not be read.
    Sensor(SensorError),
    /// An actuator command failed or a sequence was aborted.
    Actuator(ActuatorFault),
    /// The classifier produced nothing usable.
    Classification(ClassificationError),
    /// Frame acquisition failed.
    Camera(CameraError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Classification(e) => write!(f, "classification: {e}"),
            Self::Camera(e) => write!(f, "camera: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Corrupted => Self::Config("stored config is corrupted"),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed(InputPin),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed(pin) => {
                write!(f, "read failed on {pin} (GPIO{})", gpio_for(*pin))
            }
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator faults
// ---------------------------------------------------------------------------

/// Hardware failure while driving an actuator choreography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorFault {
    /// PWM write to a servo failed.
    ServoWriteFailed(ServoId),
    /// Pixel write or flush on an LED zone failed.
    LedWriteFailed(LedZone),
    /// A beam read required by the choreography could not be obtained.
    SensorIo(BeamId),
}

impl fmt::Display for ActuatorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServoWriteFailed(id) => write!(f, "{id} servo write failed"),
            Self::LedWriteFailed(zone) => write!(f, "{zone} LED write failed"),
            Self::SensorIo(beam) => write!(f, "{beam} unreadable mid-sequence"),
        }
    }
}

impl From<ActuatorFault> for Error {
    fn from(e: ActuatorFault) -> Self {
        Self::Actuator(e)
    }
}

/// Why `ActuatorSequencer::run_sequence` did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// Another sequence holds the sequencer.  Not queued; retry later.
    Busy,
    /// A hardware fault aborted the sequence.  Actuators were driven safe.
    Fault(ActuatorFault),
    /// Shutdown was requested during a settle delay.
    Cancelled,
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "sequencer busy"),
            Self::Fault(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "cancelled by shutdown"),
        }
    }
}

impl From<ActuatorFault> for SequenceError {
    fn from(e: ActuatorFault) -> Self {
        Self::Fault(e)
    }
}

// ---------------------------------------------------------------------------
// Classification / camera
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationError {
    /// The classifier returned no usable category.
    EmptyResult,
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResult => write!(f, "classifier returned no categories"),
        }
    }
}

impl From<ClassificationError> for Error {
    fn from(e: ClassificationError) -> Self {
        Self::Classification(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// No frame arrived within the wait budget.
    Timeout,
    /// The frame source is gone and cannot be restarted.
    Disconnected,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "frame wait budget exceeded"),
            Self::Disconnected => write!(f, "frame source disconnected"),
        }
    }
}

impl From<CameraError> for Error {
    fn from(e: CameraError) -> Self {
        Self::Camera(e)
    }
}

// ---------------------------------------------------------------------------
// Challenge errors
// ---------------------------------------------------------------------------

/// Non-fatal, user-facing reasons a challenge was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    /// Nothing has been classified yet.
    NoDecision,
    /// The challenge window for the last decision has closed.
    Expired,
    /// This capture has already been challenged.
    AlreadyChallenged,
    /// The persistence collaborator refused the ticket.
    UploadFailed,
}

impl fmt::Display for ChallengeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDecision => write!(f, "nothing to challenge yet"),
            Self::Expired => {
                write!(f, "ran out of time to challenge; classify again, then challenge")
            }
            Self::AlreadyChallenged => write!(f, "cannot challenge the same image twice"),
            Self::UploadFailed => write!(f, "challenge upload failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers shared by errors and ports
// ---------------------------------------------------------------------------

/// The two servos on the bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServoId {
    /// Flap that tips the item into the recyclable or non-recyclable side.
    Selector,
    /// Latch on the access door.
    Lock,
}

impl fmt::Display for ServoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector => write!(f, "selector"),
            Self::Lock => write!(f, "lock"),
        }
    }
}

/// The two addressable LED strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedZone {
    /// Interior strip lighting the camera scene; shows cycle feedback.
    Interior,
    /// Outside indicator strip; shows the lock/full state.
    Status,
}

impl fmt::Display for LedZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interior => write!(f, "interior"),
            Self::Status => write!(f, "status"),
        }
    }
}

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
