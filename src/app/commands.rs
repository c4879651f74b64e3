//! Operator commands and their results.
//!
//! A [`PowerCommand`] is what the operator asks for; a [`CommandResult`] is
//! the one-shot answer the [`PowerController`](super::controller::PowerController)
//! hands back.  Results serialize to the JSON envelope printed by the
//! operator shell.

use core::fmt::{self, Write as _};

use serde::Serialize;

use crate::config::PulseTimings;
use crate::status::PowerStatus;

/// Capacity of a result message.  Every message the controller builds fits.
pub const MESSAGE_CAPACITY: usize = 96;

/// Which front-panel button a command presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    Power,
    Reboot,
}

/// Commands the operator can issue against the attached machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerCommand {
    /// Short press on the power button.
    PowerOn,
    /// Long press on the power button (forced off).
    PowerOff,
    /// Press on the reset button.
    Reboot,
}

impl PowerCommand {
    pub const ALL: [PowerCommand; 3] = [Self::PowerOn, Self::PowerOff, Self::Reboot];

    pub const fn label(self) -> &'static str {
        match self {
            Self::PowerOn => "Power On",
            Self::PowerOff => "Power Off",
            Self::Reboot => "Reboot",
        }
    }

    /// The only status in which the command is permitted.
    pub const fn required_status(self) -> PowerStatus {
        match self {
            Self::PowerOn => PowerStatus::PoweredOff,
            Self::PowerOff | Self::Reboot => PowerStatus::PoweredOn,
        }
    }

    pub const fn switch(self) -> SwitchKind {
        match self {
            Self::PowerOn | Self::PowerOff => SwitchKind::Power,
            Self::Reboot => SwitchKind::Reboot,
        }
    }

    pub fn hold(self, timings: &PulseTimings) -> core::time::Duration {
        match self {
            Self::PowerOn => timings.power_on,
            Self::PowerOff => timings.power_off,
            Self::Reboot => timings.reboot,
        }
    }
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Success,
    Error,
}

/// Outcome of one controller command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    #[serde(rename = "command_status")]
    pub status: CommandStatus,
    pub message: heapless::String<MESSAGE_CAPACITY>,
}

impl CommandResult {
    pub fn success(args: fmt::Arguments<'_>) -> Self {
        Self::build(CommandStatus::Success, args)
    }

    pub fn error(args: fmt::Arguments<'_>) -> Self {
        Self::build(CommandStatus::Error, args)
    }

    fn build(status: CommandStatus, args: fmt::Arguments<'_>) -> Self {
        let mut message = heapless::String::new();
        // Overflow truncates; the fixed messages all fit.
        let _ = message.write_fmt(args);
        Self { status, message }
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    /// `{"command_status":"SUCCESS","message":"..."}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // Not reachable for this shape.
            String::from(r#"{"command_status":"ERROR","message":"serialization failed"}"#)
        })
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.status {
            CommandStatus::Success => "SUCCESS",
            CommandStatus::Error => "ERROR",
        };
        write!(f, "{}: {}", tag, self.message)
    }
}
