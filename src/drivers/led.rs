//! LED zone palette.
//!
//! The two WS281x strips are driven through the
//! [`ActuatorPort`](crate::app::ports::ActuatorPort) capability "paint a
//! zone, then flush".  This module only names the colours each bin state
//! shows.
//!
//! | Colour      | Zone     | Meaning                          |
//! |-------------|----------|----------------------------------|
//! | Idle        | interior | ready, waiting for an item       |
//! | Processing  | interior | capture/classify in progress     |
//! | Accepted    | interior | item routed to recycling         |
//! | Rejected    | interior | item routed to non-recyclable    |
//! | Locked      | status   | door locked (jam or full bin)    |
//! | Off         | both     | cooldown / shutdown              |

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColour {
    Off,
    Idle,
    Processing,
    Accepted,
    Rejected,
    Locked,
}

impl LedColour {
    pub const fn rgb(self) -> Rgb {
        match self {
            Self::Off => COLOUR_OFF,
            Self::Idle => COLOUR_IDLE,
            Self::Processing => COLOUR_PROCESSING,
            Self::Accepted => COLOUR_ACCEPTED,
            Self::Rejected => COLOUR_REJECTED,
            Self::Locked => COLOUR_LOCKED,
        }
    }
}

pub const COLOUR_OFF: Rgb = (0, 0, 0);
pub const COLOUR_IDLE: Rgb = (24, 22, 20); // Dim warm white
pub const COLOUR_PROCESSING: Rgb = (246, 160, 40); // Amber
pub const COLOUR_ACCEPTED: Rgb = (0, 255, 0); // Green
pub const COLOUR_REJECTED: Rgb = (220, 40, 0); // Red
pub const COLOUR_LOCKED: Rgb = (255, 0, 0); // Full red
