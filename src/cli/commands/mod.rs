//! Command execution.
//!
//! Every command returns an exit code; failures are printed with the step
//! that failed and recovery suggestions, then mapped to exit code 1.

mod run;
mod target;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::{ConfigOverrides, PipelineConfig};
use crate::error::Result;
use std::path::Path;

use run::execute_run;
use target::execute_target;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Run(run_args) => execute_run(run_args, &config).await,
        Command::Target(target_args) => execute_target(target_args, &config),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            match e.step() {
                Some(step) => config.error_println(&format!("Step '{}' failed: {}", step, e)),
                None => config.error_println(&format!(
                    "Command '{}' failed: {}",
                    args.command.name(),
                    e
                )),
            }

            if !config.is_quiet() {
                let suggestions = e.recovery_suggestions();
                if !suggestions.is_empty() {
                    config.println("\n💡 Recovery suggestions:");
                    for suggestion in suggestions {
                        config.println(&format!("  • {}", suggestion));
                    }
                }
            }

            Ok(1)
        }
    }
}

/// Load config in precedence order: file, environment, command line
pub(super) fn load_pipeline_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)?;
    config.apply_env()?;
    config.apply_overrides(overrides)?;
    config.validate()?;
    Ok(config)
}
