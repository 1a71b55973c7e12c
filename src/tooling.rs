//! Tooling & Integration Layer
//!
//! Command-line host for the naming and path history subsystems.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, HistoryCommands};
