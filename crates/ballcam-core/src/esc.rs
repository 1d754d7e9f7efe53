use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest accepted pulse width in microseconds.
pub const MAX_PULSE_US: u32 = 2000;

/// One of the two speed-controller outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EscChannel {
    Esc1,
    Esc2,
}

impl EscChannel {
    pub const ALL: [EscChannel; 2] = [EscChannel::Esc1, EscChannel::Esc2];

    pub fn number(self) -> u8 {
        match self {
            EscChannel::Esc1 => 1,
            EscChannel::Esc2 => 2,
        }
    }
}

impl TryFrom<u8> for EscChannel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EscChannel::Esc1),
            2 => Ok(EscChannel::Esc2),
            other => Err(format!("ESC channel must be 1 or 2, got {}", other)),
        }
    }
}

impl From<EscChannel> for u8 {
    fn from(channel: EscChannel) -> u8 {
        channel.number()
    }
}

impl fmt::Display for EscChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ESC{}", self.number())
    }
}

/// A pulse-width command for one ESC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleCmd {
    #[serde(rename = "esc")]
    pub channel: EscChannel,
    /// Pulse width in microseconds. `0` switches the pulses off.
    #[serde(rename = "pulse")]
    pub pulse_us: u32,
}

impl ThrottleCmd {
    pub fn new(channel: EscChannel, pulse_us: u32) -> Self {
        Self { channel, pulse_us }
    }

    pub fn off(channel: EscChannel) -> Self {
        Self::new(channel, 0)
    }

    pub fn is_valid(&self) -> bool {
        self.pulse_us <= MAX_PULSE_US
    }
}
