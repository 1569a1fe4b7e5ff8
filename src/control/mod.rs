//! Sorting control: classify → decide → actuate → allow a challenge.

pub mod challenge;
pub mod gate;
pub mod sequencer;

pub use challenge::{ChallengeWindow, UploadTicket};
pub use gate::{decide, Category, ClassificationResult, DecisionKind, SortDecision};
pub use sequencer::{ActuatorSequencer, ActuatorState, SequenceKind};
