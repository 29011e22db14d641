//! System integration test modules

pub mod properties;
pub mod scenarios;
pub mod shutdown;
