//! Package build step.
//!
//! Runs the external build tool (`python -m build`, default arguments) in the
//! source tree and collects what it writes to `dist/`.

mod artifact;

pub use artifact::{ArtifactKind, BuildArtifact, BuildArtifactSet};

use crate::environment::ProvisionedEnvironment;
use crate::error::{BuildError, Result};
use crate::source::SourceTree;
use std::path::Path;

/// Output location the build tool writes to, relative to the source root
pub const DIST_DIR: &str = "dist";

/// Build distributable artifacts from `source` using `environment`
pub async fn build(
    environment: &ProvisionedEnvironment,
    source: &SourceTree,
) -> Result<BuildArtifactSet> {
    let dist_dir = source.path.join(DIST_DIR);
    clear_stale_output(&dist_dir)?;

    let command = environment.module_command("build").current_dir(&source.path);
    log::info!("building {}", source.path.display());

    let output = command.run().await.map_err(|e| BuildError::Spawn {
        command: command.display(),
        reason: e.to_string(),
    })?;

    if !output.success {
        return Err(BuildError::ToolFailed {
            command: command.display(),
            output: output.diagnostics(),
        }
        .into());
    }

    let artifacts = BuildArtifactSet::collect(&dist_dir)?;
    log::info!(
        "built {} artifact(s): {}",
        artifacts.len(),
        artifacts.file_names().join(", ")
    );
    Ok(artifacts)
}

fn clear_stale_output(dist_dir: &Path) -> Result<()> {
    if dist_dir.exists() {
        log::warn!("removing stale {} before building", dist_dir.display());
        std::fs::remove_dir_all(dist_dir).map_err(|e| BuildError::Output {
            path: dist_dir.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
