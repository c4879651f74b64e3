//! System configuration parameters
//!
//! Line assignments, polarities, timings and storage locations for one
//! controlled machine.  Loaded from a JSON file through
//! [`ConfigPort`](crate::app::ports::ConfigPort); every field falls back to
//! its default when absent from the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::LineId;
use crate::pins;

/// Which electrical level represents "circuit closed" / "asserted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Pin level (`true` = high) that asserts the line.
    pub const fn active_level(self) -> bool {
        matches!(self, Self::ActiveHigh)
    }

    /// Pin level that deasserts the line.
    pub const fn inactive_level(self) -> bool {
        !self.active_level()
    }

    /// Interpret a raw pin level.
    pub const fn is_active(self, high: bool) -> bool {
        high == self.active_level()
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Lines ---
    /// Relay output across the power button.
    pub power_switch_gpio: LineId,
    /// Relay output across the reset button.
    pub reboot_switch_gpio: LineId,
    /// Power-good sense input.
    pub power_status_gpio: LineId,
    /// Motherboard buzzer sense input.
    pub buzzer_gpio: LineId,

    // --- Polarity ---
    /// Trigger polarity of both relays.
    pub switch_polarity: Polarity,
    /// Asserted level of both sense inputs.
    pub sense_polarity: Polarity,

    // --- Timing ---
    /// Status sense sampling interval (milliseconds)
    pub status_poll_interval_ms: u32,
    /// Power-on button hold (milliseconds)
    pub power_on_hold_ms: u32,
    /// Forced power-off button hold (milliseconds)
    pub power_off_hold_ms: u32,
    /// Reset button hold (milliseconds)
    pub reboot_hold_ms: u32,

    // --- Storage ---
    /// Shared status record written by the monitor.
    pub status_file: PathBuf,
    /// Root of the sysfs GPIO interface.
    pub gpio_root: PathBuf,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Lines
            power_switch_gpio: pins::POWER_SWITCH_GPIO,
            reboot_switch_gpio: pins::REBOOT_SWITCH_GPIO,
            power_status_gpio: pins::POWER_STATUS_GPIO,
            buzzer_gpio: pins::BUZZER_GPIO,

            // Polarity
            switch_polarity: Polarity::ActiveLow,
            sense_polarity: Polarity::ActiveHigh,

            // Timing
            status_poll_interval_ms: pins::STATUS_POLL_INTERVAL_MS, // 100 Hz
            power_on_hold_ms: pins::POWER_ON_HOLD_MS,
            power_off_hold_ms: pins::POWER_OFF_HOLD_MS,
            reboot_hold_ms: pins::REBOOT_HOLD_MS,

            // Storage
            status_file: PathBuf::from("/run/pcpower/power_status"),
            gpio_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl SystemConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.status_poll_interval_ms))
    }

    pub fn pulse_timings(&self) -> PulseTimings {
        PulseTimings {
            power_on: Duration::from_millis(u64::from(self.power_on_hold_ms)),
            power_off: Duration::from_millis(u64::from(self.power_off_hold_ms)),
            reboot: Duration::from_millis(u64::from(self.reboot_hold_ms)),
        }
    }
}

/// Hold durations for each command's button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTimings {
    pub power_on: Duration,
    pub power_off: Duration,
    pub reboot: Duration,
}

impl Default for PulseTimings {
    fn default() -> Self {
        SystemConfig::default().pulse_timings()
    }
}
