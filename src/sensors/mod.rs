//! Sensor identities and the edge debouncer.
//!
//! The bin has one PIR motion detector and four break-beam pairs.  Raw
//! edges arrive from the GPIO layer through the
//! [`EdgeQueue`](crate::events::EdgeQueue); the control thread runs them
//! through [`SensorDebouncer`] before acting on them.

pub mod debounce;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use debounce::SensorDebouncer;

/// One of the four break-beam sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamId {
    Beam1,
    Beam2,
    Beam3,
    Beam4,
}

impl BeamId {
    pub const ALL: [BeamId; 4] = [Self::Beam1, Self::Beam2, Self::Beam3, Self::Beam4];

    /// Zero-based slot index, used to size per-beam tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Beam1 => 0,
            Self::Beam2 => 1,
            Self::Beam3 => 2,
            Self::Beam4 => 3,
        }
    }
}

impl fmt::Display for BeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beam{}", self.index() + 1)
    }
}

/// Source of an asynchronous edge notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSource {
    Motion,
    Beam(BeamId),
}

impl SensorSource {
    /// Index into per-source tables: motion first, then beams.
    pub const COUNT: usize = 5;

    pub const fn index(self) -> usize {
        match self {
            Self::Motion => 0,
            Self::Beam(beam) => 1 + beam.index(),
        }
    }

    /// The GPIO input backing this source.
    pub const fn pin(self) -> InputPin {
        match self {
            Self::Motion => InputPin::Motion,
            Self::Beam(beam) => InputPin::Beam(beam),
        }
    }
}

impl fmt::Display for SensorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion => write!(f, "motion"),
            Self::Beam(beam) => write!(f, "{beam}"),
        }
    }
}

/// A digital input the controller reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPin {
    Motion,
    Beam(BeamId),
}

impl InputPin {
    /// Whether a raw level means "condition present".
    ///
    /// The PIR drives HIGH on motion.  Beam receivers are pulled up and
    /// read LOW while something blocks the beam.
    pub const fn is_active(self, level_high: bool) -> bool {
        match self {
            Self::Motion => level_high,
            Self::Beam(_) => !level_high,
        }
    }
}

impl fmt::Display for InputPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion => write!(f, "motion pin"),
            Self::Beam(beam) => write!(f, "{beam} pin"),
        }
    }
}

/// A raw edge notification.  Created in the GPIO callback, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    pub source: SensorSource,
    pub timestamp_ms: u64,
}

/// An edge that survived debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncedTrigger {
    pub source: SensorSource,
    pub timestamp_ms: u64,
}
