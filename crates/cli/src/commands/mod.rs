//! Subcommand implementations.

pub mod import;
pub mod migrate;
pub mod token;
