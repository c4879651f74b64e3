//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering application events through the
//! `log` facade under a per-component target, so `RUST_LOG` can tune the
//! monitor and the controller independently.

use log::{Level, log};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Log target of the status monitor.
pub const MONITOR_TARGET: &str = "pcpower::monitor";
/// Log target of the power controller.
pub const CONTROLLER_TARGET: &str = "pcpower::controller";

/// Adapter that logs every [`AppEvent`] under one target.
pub struct LogEventSink {
    target: &'static str,
}

impl LogEventSink {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn monitor() -> Self {
        Self::new(MONITOR_TARGET)
    }

    pub fn controller() -> Self {
        Self::new(CONTROLLER_TARGET)
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        let t = self.target;
        match event {
            AppEvent::MonitorStarted {
                status_line,
                buzzer_line,
            } => {
                log!(target: t, Level::Info, "START | status=GPIO{} buzzer=GPIO{}", status_line, buzzer_line);
            }
            AppEvent::StatusChanged { from, to } => {
                log!(target: t, Level::Info, "STATE | {} -> {}", from, to);
            }
            AppEvent::BuzzerPulse { count } => {
                log!(target: t, Level::Debug, "BUZZ  | pulse #{}", count);
            }
            AppEvent::SenseReadFailed { line, error } => {
                log!(target: t, Level::Error, "SENSE | GPIO{} {}", line, error);
            }
            AppEvent::SenseReadRecovered { line } => {
                log!(target: t, Level::Info, "SENSE | GPIO{} reading again", line);
            }
            AppEvent::StoreWriteFailed(e) => {
                log!(target: t, Level::Error, "STORE | write failed: {}", e);
            }
            AppEvent::StoreRemoveFailed(e) => {
                log!(target: t, Level::Error, "STORE | remove failed: {}", e);
            }
            AppEvent::MonitorStopped => {
                log!(target: t, Level::Info, "STOP  | monitor");
            }
            AppEvent::ControllerReady => {
                log!(target: t, Level::Info, "READY | switches claimed");
            }
            AppEvent::CommandSent(cmd) => {
                log!(target: t, Level::Info, "CMD   | {} sent", cmd);
            }
            AppEvent::CommandRejected { command, status } => {
                log!(target: t, Level::Warn, "CMD   | {} rejected, PC Power State {}", command, status);
            }
            AppEvent::CommandFailed { command, error } => {
                log!(target: t, Level::Error, "CMD   | {} failed: {}", command, error);
            }
            AppEvent::CommandInterrupted(cmd) => {
                log!(target: t, Level::Warn, "CMD   | {} interrupted by shutdown", cmd);
            }
            AppEvent::ReleaseFailed { name, error } => {
                log!(target: t, Level::Error, "STOP  | releasing {} failed: {}", name, error);
            }
            AppEvent::ControllerStopped => {
                log!(target: t, Level::Info, "STOP  | controller");
            }
        }
    }
}
