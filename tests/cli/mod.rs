//! CLI Integration Test Modules

pub mod binary;
pub mod topology_runs;
