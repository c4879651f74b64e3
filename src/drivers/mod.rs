//! Line drivers and thread helpers.

pub mod sense;
pub mod switch;
pub mod worker;
