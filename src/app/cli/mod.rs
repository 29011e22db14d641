//! CLI module containing argument parsing and topology file loading

pub mod args;
pub mod config;

#[cfg(test)]
mod tests;
