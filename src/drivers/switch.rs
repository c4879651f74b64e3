//! Relay switch driver.
//!
//! One relay wired across a front-panel button header.  A "press" is a
//! hold: assert the relay, wait, release.  The wait races a release signal
//! so [`RelaySwitch::close`] can cut a 4 s hold short.
//!
//! ## Safety contract
//!
//! The line is never left asserted by this driver on any path it controls:
//! every hold deasserts before returning, and close deasserts before
//! releasing the line.  A failed write is reported, not retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::PinState;
use futures_lite::future::{block_on, or};

use crate::app::ports::{LineId, SwitchOutput};
use crate::config::Polarity;
use crate::error::GpioError;

/// How a hold ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// The full duration elapsed.
    Completed,
    /// [`RelaySwitch::interrupt`] cut the hold short.
    Interrupted,
}

pub struct RelaySwitch<O: SwitchOutput> {
    name: &'static str,
    line: LineId,
    polarity: Polarity,
    /// `None` once closed.  Held for the whole pulse, which serializes
    /// concurrent holds on the same switch.
    pin: Mutex<Option<O>>,
    release: Signal<CriticalSectionRawMutex, ()>,
    closing: AtomicBool,
}

impl<O: SwitchOutput> RelaySwitch<O> {
    /// Wrap an output already claimed at the open-circuit level.
    pub fn new(name: &'static str, line: LineId, polarity: Polarity, pin: O) -> Self {
        Self {
            name,
            line,
            polarity,
            pin: Mutex::new(Some(pin)),
            release: Signal::new(),
            closing: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Assert the relay for `duration`, then deassert.
    ///
    /// Blocks the caller.  Returns [`GpioError::Closed`] once the switch is
    /// closing.
    pub fn hold(&self, duration: Duration) -> Result<PulseOutcome, GpioError> {
        let mut guard = self.pin.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(GpioError::Closed);
        }
        let pin = guard.as_mut().ok_or(GpioError::Closed)?;

        self.drive(pin, true)?;
        log::debug!("{} (GPIO {}) held for {:?}", self.name, self.line, duration);

        let outcome = block_on(or(
            async {
                Timer::after(duration).await;
                PulseOutcome::Completed
            },
            async {
                self.release.wait().await;
                PulseOutcome::Interrupted
            },
        ));

        self.drive(pin, false)?;
        log::debug!("{} (GPIO {}) released: {:?}", self.name, self.line, outcome);
        Ok(outcome)
    }

    /// Cut any in-flight hold short and refuse further holds.
    pub fn interrupt(&self) {
        self.closing.store(true, Ordering::Release);
        self.release.signal(());
    }

    /// Deassert and release the line.  A second call is a no-op.
    pub fn close(&self) -> Result<(), GpioError> {
        self.interrupt();
        let mut guard = self.pin.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(mut pin) = guard.take() else {
            return Ok(());
        };
        if let Err(e) = self.drive(&mut pin, false) {
            log::warn!("{}: deassert before release failed: {}", self.name, e);
        }
        pin.close()
    }

    fn drive(&self, pin: &mut O, asserted: bool) -> Result<(), GpioError> {
        let level = if asserted {
            self.polarity.active_level()
        } else {
            self.polarity.inactive_level()
        };
        pin.set_state(PinState::from(level))
    }
}

impl<O: SwitchOutput> Drop for RelaySwitch<O> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}: release on drop failed: {}", self.name, e);
        }
    }
}
