//! Outbound application events.
//!
//! The [`StatusMonitor`](super::monitor::StatusMonitor) and the
//! [`PowerController`](super::controller::PowerController) emit these through
//! their own [`EventSink`](super::ports::EventSink).  Adapters on the other
//! side decide what to do with them.

use crate::app::commands::PowerCommand;
use crate::app::ports::{LineId, StoreError};
use crate::error::{Error, GpioError};
use crate::status::PowerStatus;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    // --- Monitor ---
    /// Both sense lines claimed and the worker is running.
    MonitorStarted {
        status_line: LineId,
        buzzer_line: LineId,
    },

    /// The recorded power status changed.
    StatusChanged { from: PowerStatus, to: PowerStatus },

    /// A buzzer rising edge was recorded.
    BuzzerPulse { count: u32 },

    /// Sampling a sense line failed.  Emitted once per failure streak.
    SenseReadFailed { line: LineId, error: Error },

    /// A sense line that was failing reads again.
    SenseReadRecovered { line: LineId },

    /// The status record could not be persisted.  Retried next poll.
    StoreWriteFailed(StoreError),

    /// The status record could not be removed at shutdown.
    StoreRemoveFailed(StoreError),

    MonitorStopped,

    // --- Controller ---
    /// Both switch lines claimed at their open-circuit level.
    ControllerReady,

    /// A button pulse completed.
    CommandSent(PowerCommand),

    /// The current status forbids the command; no pulse.
    CommandRejected {
        command: PowerCommand,
        status: PowerStatus,
    },

    /// Driving the switch failed mid-command.
    CommandFailed {
        command: PowerCommand,
        error: Error,
    },

    /// A pulse was cut short by shutdown.
    CommandInterrupted(PowerCommand),

    // --- Shared ---
    /// Releasing a named line at shutdown failed.
    ReleaseFailed {
        name: &'static str,
        error: GpioError,
    },

    ControllerStopped,
}
