//! Integration tests for node naming and path history

mod cli_commands;
mod history_resolution;
mod naming_flow;
mod sled_history;
