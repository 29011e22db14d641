//! Tests for the CLI module
//!
//! Argument parsing and topology file handling.
