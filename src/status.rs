//! Power status data model shared by the monitor, the store and the
//! controller.
//!
//! The numeric codes are part of the persisted record format and must not be
//! renumbered.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Last electrically observed power state of the attached machine.
///
/// Persisted as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum PowerStatus {
    Booting = 0,
    PoweredOn = 1,
    PoweredOff = 2,
    ShuttingDown = 3,
    Error = 4,
    /// No observation yet, or the last sample failed.
    #[default]
    Unknown = 5,
}

impl PowerStatus {
    pub const ALL: [PowerStatus; 6] = [
        Self::Booting,
        Self::PoweredOn,
        Self::PoweredOff,
        Self::ShuttingDown,
        Self::Error,
        Self::Unknown,
    ];

    /// Stable numeric code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a numeric code.  `None` for anything outside 0–5.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Booting),
            1 => Some(Self::PoweredOn),
            2 => Some(Self::PoweredOff),
            3 => Some(Self::ShuttingDown),
            4 => Some(Self::Error),
            5 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Map a sampled power-good level to a status.
    pub const fn from_level(asserted: bool) -> Self {
        if asserted {
            Self::PoweredOn
        } else {
            Self::PoweredOff
        }
    }

    /// Operator-facing name, as used in command result messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booting => "Booting",
            Self::PoweredOn => "Powered On",
            Self::PoweredOff => "Powered Off",
            Self::ShuttingDown => "Shutting Down",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        }
    }
}

impl TryFrom<u8> for PowerStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: u8) -> Result<Self, UnknownStatusCode> {
        Self::from_code(code).ok_or(UnknownStatusCode(code))
    }
}

impl From<PowerStatus> for u8 {
    fn from(status: PowerStatus) -> u8 {
        status.code()
    }
}

/// A stored status code outside 0–5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownStatusCode(pub u8);

impl fmt::Display for UnknownStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown power status code {}", self.0)
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shared record written by the monitor and read by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: PowerStatus,
    /// Rising edges seen on the buzzer line since the monitor started.
    pub buzzer_pulse_count: u32,
}

impl StatusRecord {
    pub const fn new(status: PowerStatus, buzzer_pulse_count: u32) -> Self {
        Self {
            status,
            buzzer_pulse_count,
        }
    }
}
