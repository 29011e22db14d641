//! Application module: the `handoff` binary's command layer

pub mod cli;
pub mod demos;
pub mod error;
pub mod startup;
