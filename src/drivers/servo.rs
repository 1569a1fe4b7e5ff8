//! Hobby-servo driver over an `embedded-hal` PWM channel.
//!
//! The channel runs at 50 Hz (20 ms frame).  A normalised position in
//! [-1.0, 1.0] maps linearly onto the pulse range; "release" turns the
//! output fully off so the servo stops holding.
//!
//! ```text
//!  -1.0 ──▶ 0.4 ms     0.0 ──▶ 1.0 ms     +1.0 ──▶ 1.6 ms
//! ```

use embedded_hal::pwm::SetDutyCycle;

/// Servo frame period.
pub const FRAME_US: u32 = 20_000;
/// Pulse width at position -1.0.
pub const MIN_PULSE_US: u32 = 400;
/// Pulse width at position +1.0.
pub const MAX_PULSE_US: u32 = 1_600;

/// Pulse width for a normalised position (clamped).
pub fn pulse_us(position: f32) -> u32 {
    let p = if position.is_nan() {
        0.0
    } else {
        position.clamp(-1.0, 1.0)
    };
    let mid = (MIN_PULSE_US + MAX_PULSE_US) as f32 / 2.0;
    let half = (MAX_PULSE_US - MIN_PULSE_US) as f32 / 2.0;
    (mid + p * half).round() as u32
}

/// Duty value for `pulse` given the channel's maximum duty.
pub fn duty_for(pulse: u32, max_duty: u16) -> u16 {
    ((max_duty as u64 * pulse as u64) / FRAME_US as u64) as u16
}

pub struct Servo<P> {
    pwm: P,
    position: Option<f32>,
}

impl<P: SetDutyCycle> Servo<P> {
    /// Wrap a PWM channel already configured for a 50 Hz frame.
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            position: None,
        }
    }

    pub fn set_position(&mut self, position: f32) -> Result<(), P::Error> {
        let duty = duty_for(pulse_us(position), self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty)?;
        self.position = Some(position);
        Ok(())
    }

    /// Stop pulsing.  The horn stays where it is, unpowered.
    pub fn release(&mut self) -> Result<(), P::Error> {
        self.pwm.set_duty_cycle_fully_off()
    }

    /// Last commanded position.
    pub fn position(&self) -> Option<f32> {
        self.position
    }
}
