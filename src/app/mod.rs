//! Application core: domain logic behind port traits.
//!
//! The [`monitor`] keeps the shared status record current; the
//! [`controller`] turns operator commands into gated button presses.  All
//! interaction with lines and storage happens through the traits in
//! [`ports`], keeping this layer testable without real hardware.

pub mod commands;
pub mod controller;
pub mod events;
pub mod monitor;
pub mod ports;
