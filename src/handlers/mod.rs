//! Command handlers for the two host modes.

pub mod run;
pub mod watch;
