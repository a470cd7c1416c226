//! `pyrelease target`: show which registry a reference publishes to.

use crate::cli::{RuntimeConfig, TargetArgs};
use crate::config::ConfigOverrides;
use crate::error::{CliError, Result};
use crate::publish::select_target;
use crate::trigger::TriggerEvent;

/// Print the target `select_target` returns for the reference in `args`
pub(super) fn execute_target(args: &TargetArgs, config: &RuntimeConfig) -> Result<i32> {
    let reference = args.reference.clone().ok_or_else(|| CliError::MissingArgument {
        argument: "--ref".to_string(),
    })?;
    let trigger = TriggerEvent::new(reference, None);

    let overrides = ConfigOverrides {
        registry_url: args.registry_url.clone(),
        ..ConfigOverrides::default()
    };
    let pipeline_config = super::load_pipeline_config(args.config.as_deref(), &overrides)?;
    let target = select_target(&trigger, &pipeline_config.publish);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&target)?);
        return Ok(0);
    }

    config.println(&format!("Reference:  {} ({})", trigger.reference, trigger.kind));
    config.println(&format!("Target:     {}", target.kind));
    config.println(&format!("Registry:   {}", target.registry()));
    config.println(&format!("Credential: ${}", target.credential_env));
    Ok(0)
}
