//! Power controller: gated button presses.
//!
//! Each command reads the shared status record, refuses to act unless the
//! machine is in the command's required state, then holds the matching
//! relay for the command's duration.
//!
//! | Command   | Requires     | Switch | Hold |
//! |-----------|--------------|--------|------|
//! | power on  | Powered Off  | power  | 2 s  |
//! | power off | Powered On   | power  | 4 s  |
//! | reboot    | Powered On   | reboot | 2 s  |
//!
//! The status read and the press are not atomic: a status change between
//! the two goes unnoticed.  One operator at a time is assumed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::app::commands::{CommandResult, PowerCommand, SwitchKind};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, GpioPort, LineId, StatusStore, SwitchOutput};
use crate::config::{PulseTimings, SystemConfig};
use crate::drivers::switch::{PulseOutcome, RelaySwitch};
use crate::error::{Error, GpioError, Result};
use crate::status::PowerStatus;

/// Issues power / reset button presses on behalf of the operator.
///
/// `Sync`: commands take `&self`, and presses on the same switch are
/// serialized by the switch itself.
pub struct PowerController<O: SwitchOutput + 'static> {
    power: RelaySwitch<O>,
    reboot: RelaySwitch<O>,
    timings: PulseTimings,
    store: Arc<dyn StatusStore>,
    sink: Arc<dyn EventSink>,
    stopped: AtomicBool,
}

impl<O: SwitchOutput + 'static> PowerController<O> {
    /// Clear any claim left on the switch lines by an unclean exit, then
    /// claim both at the open-circuit level.
    pub fn new<G: GpioPort<Output = O>>(
        gpio: &mut G,
        config: &SystemConfig,
        store: Arc<dyn StatusStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let power_line = config.power_switch_gpio;
        let reboot_line = config.reboot_switch_gpio;
        let polarity = config.switch_polarity;

        for line in [power_line, reboot_line] {
            preclear(gpio, line);
        }

        let open = polarity.inactive_level();
        let pin = gpio
            .claim_output(power_line, open)
            .map_err(|source| acquire_error(power_line, source))?;
        let power = RelaySwitch::new("power switch", power_line, polarity, pin);

        let pin = match gpio.claim_output(reboot_line, open) {
            Ok(pin) => pin,
            Err(source) => {
                if let Err(error) = power.close() {
                    sink.emit(&AppEvent::ReleaseFailed {
                        name: power.name(),
                        error,
                    });
                }
                return Err(acquire_error(reboot_line, source));
            }
        };
        let reboot = RelaySwitch::new("reboot switch", reboot_line, polarity, pin);

        sink.emit(&AppEvent::ControllerReady);
        Ok(Self {
            power,
            reboot,
            timings: config.pulse_timings(),
            store,
            sink,
            stopped: AtomicBool::new(false),
        })
    }

    /// Short press on the power button.  Requires Powered Off.
    pub fn power_on(&self) -> CommandResult {
        self.execute(PowerCommand::PowerOn)
    }

    /// Long press on the power button.  Requires Powered On.
    pub fn power_off(&self) -> CommandResult {
        self.execute(PowerCommand::PowerOff)
    }

    /// Press on the reset button.  Requires Powered On.
    pub fn reboot(&self) -> CommandResult {
        self.execute(PowerCommand::Reboot)
    }

    /// Gate and run one command.  Blocks for the hold duration.
    pub fn execute(&self, command: PowerCommand) -> CommandResult {
        let label = command.label();
        if self.is_shut_down() {
            return CommandResult::error(format_args!(
                "{} Command NOT Sent: Controller Shut Down",
                label
            ));
        }

        if let Err(Error::Precondition(status)) = self.check(command) {
            self.sink.emit(&AppEvent::CommandRejected { command, status });
            return CommandResult::error(format_args!(
                "{} Command NOT Sent: PC Power State {}",
                label, status
            ));
        }

        match self.press(command) {
            Ok(PulseOutcome::Completed) => {
                self.sink.emit(&AppEvent::CommandSent(command));
                CommandResult::success(format_args!("{} Command Sent", label))
            }
            Ok(PulseOutcome::Interrupted) => {
                self.sink.emit(&AppEvent::CommandInterrupted(command));
                CommandResult::error(format_args!(
                    "{} Command Interrupted: Controller Shutting Down",
                    label
                ))
            }
            Err(Error::Write(GpioError::Closed)) => CommandResult::error(format_args!(
                "{} Command NOT Sent: Controller Shut Down",
                label
            )),
            Err(error) => {
                self.sink.emit(&AppEvent::CommandFailed { command, error });
                CommandResult::error(format_args!("{} Command NOT Sent Due to Some Error", label))
            }
        }
    }

    /// `Err(Precondition)` unless the recorded status permits `command`.
    pub fn check(&self, command: PowerCommand) -> Result<()> {
        let status = self.last_status();
        if status == command.required_status() {
            Ok(())
        } else {
            Err(Error::Precondition(status))
        }
    }

    fn press(&self, command: PowerCommand) -> Result<PulseOutcome> {
        let switch = match command.switch() {
            SwitchKind::Power => &self.power,
            SwitchKind::Reboot => &self.reboot,
        };
        switch
            .hold(command.hold(&self.timings))
            .map_err(Error::Write)
    }

    /// Status currently in the shared record.  `Unknown` when no monitor
    /// is running.
    pub fn last_status(&self) -> PowerStatus {
        self.store.read().status
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Cut any press short and release both switch lines.
    ///
    /// Never fails; problems are logged.  A second call is a no-op.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            info!("controller already shut down");
            return;
        }

        // Wake both holds before blocking on either switch's lock.
        self.power.interrupt();
        self.reboot.interrupt();

        for switch in [&self.power, &self.reboot] {
            if let Err(error) = switch.close() {
                self.sink.emit(&AppEvent::ReleaseFailed {
                    name: switch.name(),
                    error,
                });
            }
        }
        self.sink.emit(&AppEvent::ControllerStopped);
    }
}

impl<O: SwitchOutput + 'static> Drop for PowerController<O> {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}

fn acquire_error(line: LineId, source: GpioError) -> Error {
    Error::Acquire { line, source }
}

/// Release a stale claim on `line`.  Nothing to release is the normal case.
fn preclear<G: GpioPort>(gpio: &mut G, line: LineId) {
    match gpio.release(line) {
        Ok(()) => info!("GPIO {}: released stale claim", line),
        Err(GpioError::NotInitialized) => {}
        Err(e) => warn!("GPIO {}: pre-clear failed: {}", line, e),
    }
}
