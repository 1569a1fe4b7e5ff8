//! GPIO pin assignments for the bin's controller board (BCM numbering).
//!
//! Single source of truth for pin numbers; logs and sensor errors name
//! inputs by their GPIO through [`gpio_for`].  Which beam gates which action is
//! deployment configuration ([`BinConfig`](crate::config::BinConfig)), not
//! wiring.

use crate::sensors::{BeamId, InputPin};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// PIR motion detector.  HIGH = motion.
pub const MOTION_GPIO: u8 = 4;

/// Break-beam receivers, pulled up.  LOW = beam blocked.
pub const BEAM1_GPIO: u8 = 5;
pub const BEAM2_GPIO: u8 = 6;
pub const BEAM3_GPIO: u8 = 13;
pub const BEAM4_GPIO: u8 = 16;

// ---------------------------------------------------------------------------
// Servos (50 Hz PWM)
// ---------------------------------------------------------------------------

/// Selector flap: routes the item to the recycling or reject chute.
pub const SELECTOR_SERVO_GPIO: u8 = 17;
/// Door lock bolt.
pub const LOCK_SERVO_GPIO: u8 = 27;

// ---------------------------------------------------------------------------
// LED strips (WS281x)
// ---------------------------------------------------------------------------

/// Interior strip: per-cycle feedback.
pub const INTERIOR_LED_GPIO: u8 = 12;
pub const INTERIOR_LED_COUNT: usize = 16;
/// Status strip on the lid: lock / full indicator.
pub const STATUS_LED_GPIO: u8 = 18;
pub const STATUS_LED_COUNT: usize = 8;

/// GPIO number for a logical input.
pub const fn gpio_for(pin: InputPin) -> u8 {
    match pin {
        InputPin::Motion => MOTION_GPIO,
        InputPin::Beam(BeamId::Beam1) => BEAM1_GPIO,
        InputPin::Beam(BeamId::Beam2) => BEAM2_GPIO,
        InputPin::Beam(BeamId::Beam3) => BEAM3_GPIO,
        InputPin::Beam(BeamId::Beam4) => BEAM4_GPIO,
    }
}
