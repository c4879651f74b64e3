//! Default GPIO line assignments for the relay/sense hat.
//!
//! Single source of truth for the defaults in [`SystemConfig`]; a deployed
//! board overrides them through the config file rather than by editing
//! this module.
//!
//! Numbers are Linux GPIO line numbers (BCM numbering on a Raspberry Pi).
//!
//! [`SystemConfig`]: crate::config::SystemConfig

use crate::app::ports::LineId;

// ---------------------------------------------------------------------------
// Relay outputs (wired across the front-panel button headers)
// ---------------------------------------------------------------------------

/// Relay across the PWR_SW header.  Low-trigger relay board by default.
pub const POWER_SWITCH_GPIO: LineId = 17;
/// Relay across the RESET_SW header.
pub const REBOOT_SWITCH_GPIO: LineId = 27;

// ---------------------------------------------------------------------------
// Sense inputs
// ---------------------------------------------------------------------------

/// Power-good sense via opto-isolator on the power LED header.
/// HIGH = machine powered on.
pub const POWER_STATUS_GPIO: LineId = 22;
/// Motherboard speaker header via opto-isolator.  Rising edge per beep.
pub const BUZZER_GPIO: LineId = 23;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Status sense sampling interval.
pub const STATUS_POLL_INTERVAL_MS: u32 = 10;
/// Short press on the power button: power on.
pub const POWER_ON_HOLD_MS: u32 = 2_000;
/// Long press on the power button: forced power off.
pub const POWER_OFF_HOLD_MS: u32 = 4_000;
/// Press on the reset button.
pub const REBOOT_HOLD_MS: u32 = 2_000;
