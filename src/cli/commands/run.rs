//! `pyrelease run`: one full pipeline run.

use crate::cli::{RunArgs, RuntimeConfig};
use crate::config::ConfigOverrides;
use crate::error::{CliError, Result};
use crate::pipeline::{ReleasePipeline, ToolchainSteps};
use crate::trigger::TriggerEvent;

/// Execute a pipeline run for the trigger in `args`
pub(super) async fn execute_run(args: &RunArgs, config: &RuntimeConfig) -> Result<i32> {
    let reference = args.reference.clone().ok_or_else(|| CliError::MissingArgument {
        argument: "--ref".to_string(),
    })?;
    let trigger = TriggerEvent::new(reference, args.sha.clone());

    let overrides = ConfigOverrides {
        repository: args.source.clone(),
        registry_url: args.registry_url.clone(),
        python: args.python.clone(),
        keep_work_dir: args.keep_work_dir,
    };
    let pipeline_config = super::load_pipeline_config(args.config.as_deref(), &overrides)?;

    let steps = ToolchainSteps::new(&pipeline_config);
    let pipeline = ReleasePipeline::new(pipeline_config, steps);
    let outcome = pipeline.run(trigger, config).await;
    if let Some(work_dir) = pipeline.steps().work_dir()
        && work_dir.is_kept()
    {
        config.println(&format!("Working directory kept at {}", work_dir.path().display()));
    }

    if let Some(ref path) = args.report {
        match outcome.report.write_json(path) {
            Ok(()) => config.verbose_println(&format!("Run report written to {}", path.display())),
            Err(e) => config.warning_println(&format!(
                "Failed to write run report {}: {}",
                path.display(),
                e
            )),
        }
    }

    match outcome.error {
        None => {
            config.success_println("🎉 Release pipeline complete");
            Ok(0)
        }
        Some(e) => Err(e),
    }
}
