//! Unified error types for the power controller.
//!
//! A single `Error` enum that both components funnel into, keeping the
//! binary's error handling uniform.  All variants are `Copy` so they can be
//! passed through events and command results without allocation.

use core::fmt;

use crate::app::ports::{LineId, StoreError};
use crate::status::PowerStatus;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sense or switch line could not be claimed.  Fatal to construction.
    Acquire { line: LineId, source: GpioError },
    /// A sense line sample failed.
    Read(GpioError),
    /// A switch line could not be driven.
    Write(GpioError),
    /// The status record could not be created or written.
    Store(StoreError),
    /// The current power status forbids the requested command.
    Precondition(PowerStatus),
    /// The monitor worker thread could not be started.
    Spawn,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire { line, source } => write!(f, "acquire GPIO {line}: {source}"),
            Self::Read(e) => write!(f, "read: {e}"),
            Self::Write(e) => write!(f, "write: {e}"),
            Self::Store(e) => write!(f, "status store: {e}"),
            Self::Precondition(status) => write!(f, "precondition failed: PC Power State {status}"),
            Self::Spawn => write!(f, "worker thread spawn failed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Line-level GPIO errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// The line was never claimed (nothing to release).
    NotInitialized,
    /// The line is held by another owner.
    Busy,
    /// The line does not exist or could not be configured.
    Unavailable,
    /// Level read returned an error.
    ReadFailed,
    /// Level write returned an error.
    WriteFailed,
    /// Edge detection could not be installed.
    EdgeSetupFailed,
    /// The line has already been released.
    Closed,
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "line not initialized"),
            Self::Busy => write!(f, "line busy"),
            Self::Unavailable => write!(f, "line unavailable"),
            Self::ReadFailed => write!(f, "GPIO read failed"),
            Self::WriteFailed => write!(f, "GPIO write failed"),
            Self::EdgeSetupFailed => write!(f, "edge detection setup failed"),
            Self::Closed => write!(f, "line closed"),
        }
    }
}

impl std::error::Error for GpioError {}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
