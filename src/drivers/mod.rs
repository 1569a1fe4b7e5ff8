//! Actuator drivers and timing primitives.

pub mod led;
pub mod servo;
pub mod shutdown;
