//! Command line interface for pyrelease.
//!
//! Parses arguments, dispatches to the command executors, and reports the
//! outcome with colored terminal output.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RunArgs, RuntimeConfig, TargetArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
