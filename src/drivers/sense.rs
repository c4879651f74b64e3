//! Sense line driver.
//!
//! A named, polarity-aware view over a claimed [`SenseInput`]: the
//! power-good line and the buzzer line are both one of these.

use crate::app::ports::{EdgeHandler, LineId, SenseInput};
use crate::config::Polarity;
use crate::error::{Error, GpioError, Result};

pub struct SenseLine<I: SenseInput> {
    name: &'static str,
    line: LineId,
    polarity: Polarity,
    pin: Option<I>,
}

impl<I: SenseInput> SenseLine<I> {
    pub fn new(name: &'static str, line: LineId, polarity: Polarity, pin: I) -> Self {
        Self {
            name,
            line,
            polarity,
            pin: Some(pin),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    /// Sample the line.  `true` when it is at its asserted level.
    pub fn is_active(&mut self) -> Result<bool> {
        let pin = self.pin.as_mut().ok_or(Error::Read(GpioError::Closed))?;
        let high = pin.is_high().map_err(Error::Read)?;
        Ok(self.polarity.is_active(high))
    }

    /// Install the rising-edge handler.  Rising is electrical (low → high),
    /// independent of polarity.
    pub fn on_rising_edge(&mut self, handler: EdgeHandler) -> core::result::Result<(), GpioError> {
        self.pin
            .as_mut()
            .ok_or(GpioError::Closed)?
            .on_rising_edge(handler)
    }

    /// Release the line.  A second call is a no-op.
    pub fn close(&mut self) -> core::result::Result<(), GpioError> {
        match self.pin.take() {
            Some(mut pin) => pin.close(),
            None => Ok(()),
        }
    }
}

impl<I: SenseInput> Drop for SenseLine<I> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}: release on drop failed: {}", self.name, e);
        }
    }
}
