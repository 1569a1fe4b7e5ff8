//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the digital inputs, both servos and both LED strips, exposing
//! them through [`SensorPort`] and [`ActuatorPort`].  Generic over the
//! `embedded-hal` traits so any HAL (Linux GPIO character device, a PWM
//! HAT, a test double) can be plugged in.
//!
//! Edges are detected by polling: [`poll_edges`](SensorPort::poll_edges)
//! compares each input with the level seen on the previous cycle and
//! reports a transition into the active state.

use core::fmt::Debug;

use embedded_hal::digital::InputPin as DigitalInput;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::{ActuatorPort, SensorPort, ServoCommand};
use crate::drivers::led::{COLOUR_OFF, Rgb};
use crate::drivers::servo::Servo;
use crate::error::{ActuatorFault, LedZone, SensorError, ServoId};
use crate::events::EdgeNotifier;
use crate::pins::gpio_for;
use crate::sensors::{BeamId, InputPin, SensorSource};

/// An addressable LED strip (WS281x or similar).
pub trait PixelStrip {
    type Error: Debug;

    /// Set every pixel in the local buffer.
    fn fill(&mut self, colour: Rgb);

    /// Latch the buffer out to the LEDs.
    fn show(&mut self) -> Result<(), Self::Error>;
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct GpioHardware<I, P, S>
where
    I: DigitalInput,
    P: SetDutyCycle,
    S: PixelStrip,
{
    motion: I,
    beams: [I; 4],
    selector: Servo<P>,
    lock: Servo<P>,
    interior: S,
    status: S,
    /// Active/inactive per source on the previous poll.
    last_active: [Option<bool>; SensorSource::COUNT],
}

impl<I, P, S> GpioHardware<I, P, S>
where
    I: DigitalInput,
    P: SetDutyCycle,
    S: PixelStrip,
{
    pub fn new(motion: I, beams: [I; 4], selector: P, lock: P, interior: S, status: S) -> Self {
        Self {
            motion,
            beams,
            selector: Servo::new(selector),
            lock: Servo::new(lock),
            interior,
            status,
            last_active: [None; SensorSource::COUNT],
        }
    }

    fn input(&mut self, pin: InputPin) -> &mut I {
        match pin {
            InputPin::Motion => &mut self.motion,
            InputPin::Beam(beam) => &mut self.beams[beam.index()],
        }
    }

    fn strip(&mut self, zone: LedZone) -> &mut S {
        match zone {
            LedZone::Interior => &mut self.interior,
            LedZone::Status => &mut self.status,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I, P, S> SensorPort for GpioHardware<I, P, S>
where
    I: DigitalInput,
    P: SetDutyCycle,
    S: PixelStrip,
{
    fn read_pin(&mut self, pin: InputPin) -> Result<bool, SensorError> {
        self.input(pin)
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed(pin))
    }

    fn poll_edges(&mut self, now_ms: u64, notifier: &EdgeNotifier) {
        let sources = core::iter::once(SensorSource::Motion)
            .chain(BeamId::ALL.into_iter().map(SensorSource::Beam));
        for source in sources {
            let active = match self.is_active(source.pin()) {
                Ok(active) => active,
                Err(e) => {
                    warn!("Edge poll: {}", e);
                    continue;
                }
            };
            let slot = &mut self.last_active[source.index()];
            if active && *slot == Some(false) {
                debug!(
                    "Edge on {} (GPIO{}) at {}ms",
                    source,
                    gpio_for(source.pin()),
                    now_ms
                );
                notifier.notify(source, now_ms);
            }
            *slot = Some(active);
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I, P, S> ActuatorPort for GpioHardware<I, P, S>
where
    I: DigitalInput,
    P: SetDutyCycle,
    S: PixelStrip,
{
    fn set_servo(&mut self, servo: ServoId, command: ServoCommand) -> Result<(), ActuatorFault> {
        let driver = match servo {
            ServoId::Selector => &mut self.selector,
            ServoId::Lock => &mut self.lock,
        };
        let result = match command {
            ServoCommand::Position(position) => driver.set_position(position),
            ServoCommand::Release => driver.release(),
        };
        result.map_err(|_| ActuatorFault::ServoWriteFailed(servo))
    }

    fn set_pixel_range(&mut self, zone: LedZone, colour: Rgb) -> Result<(), ActuatorFault> {
        self.strip(zone).fill(colour);
        Ok(())
    }

    fn flush(&mut self, zone: LedZone) -> Result<(), ActuatorFault> {
        self.strip(zone).show().map_err(|e| {
            warn!("{} strip: {:?}", zone, e);
            ActuatorFault::LedWriteFailed(zone)
        })
    }
}

impl<I, P, S> Drop for GpioHardware<I, P, S>
where
    I: DigitalInput,
    P: SetDutyCycle,
    S: PixelStrip,
{
    fn drop(&mut self) {
        let _ = self.selector.release();
        let _ = self.lock.release();
        for zone in [LedZone::Interior, LedZone::Status] {
            let strip = self.strip(zone);
            strip.fill(COLOUR_OFF);
            let _ = strip.show();
        }
        debug!("Hardware released");
    }
}
