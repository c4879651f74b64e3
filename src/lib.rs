//! Out-of-band PC power controller library.
//!
//! Exposes the monitor, the controller, their port traits and the Linux
//! adapters for the `pcpower` binary and for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod status;

pub use app::commands::{CommandResult, CommandStatus, PowerCommand};
pub use app::controller::PowerController;
pub use app::monitor::StatusMonitor;
pub use error::{Error, GpioError, Result};
pub use status::{PowerStatus, StatusRecord};
