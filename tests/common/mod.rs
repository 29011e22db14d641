//! Common test utilities and helpers
//!
//! Shared tuning and source builders for integration tests.

pub mod test_helpers;
