//! Execution environment provisioning.
//!
//! Finds a Python interpreter satisfying the declared version requirement,
//! creates an isolated virtual environment from it, and installs the build
//! and upload tools into that environment.

mod interpreter;

pub use interpreter::{Interpreter, parse_python_version};

use crate::config::RuntimeSpec;
use crate::error::{ProvisioningError, Result};
use crate::process::{ToolCommand, ToolOutput};
use semver::VersionReq;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A ready-to-use environment for the build and publish steps
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedEnvironment {
    /// Interpreter inside the virtual environment
    pub python: PathBuf,
    /// Version of the interpreter
    pub version: semver::Version,
    /// Interpreter the environment was created from
    pub base_interpreter: PathBuf,
    /// Virtual environment root
    pub venv: PathBuf,
}

impl ProvisionedEnvironment {
    /// Command running `python -m <module>` inside the environment
    pub fn module_command(&self, module: &str) -> ToolCommand {
        ToolCommand::new(self.python.as_os_str()).args(["-m", module])
    }
}

/// Prepare an environment in `venv_dir` satisfying `spec`
pub async fn provision(spec: &RuntimeSpec, venv_dir: &Path) -> Result<ProvisionedEnvironment> {
    let requirement =
        VersionReq::parse(&spec.python).map_err(|e| ProvisioningError::InvalidRequirement {
            requirement: spec.python.clone(),
            reason: e.to_string(),
        })?;

    let base = interpreter::find_matching(&spec.interpreters, &requirement, &spec.python).await?;
    log::info!(
        "using Python {} at {}",
        base.version,
        base.path.display()
    );

    let venv = run(
        ToolCommand::new(base.path.as_os_str())
            .args(["-m", "venv", "--clear"])
            .arg(venv_dir.as_os_str()),
    )
    .await?;
    if !venv.success {
        return Err(ProvisioningError::VenvFailed {
            path: venv_dir.to_path_buf(),
            output: venv.diagnostics(),
        }
        .into());
    }

    let environment = ProvisionedEnvironment {
        python: venv_python(venv_dir),
        version: base.version,
        base_interpreter: base.path,
        venv: venv_dir.to_path_buf(),
    };

    if !spec.tools.is_empty() {
        log::info!("installing {}", spec.tools.join(", "));
        let install = run(
            environment
                .module_command("pip")
                .args(["install", "--upgrade", "--disable-pip-version-check", "--quiet"])
                .args(&spec.tools),
        )
        .await?;
        if !install.success {
            return Err(ProvisioningError::ToolInstallFailed {
                tools: spec.tools.join(", "),
                output: install.diagnostics(),
            }
            .into());
        }
    }

    Ok(environment)
}

/// Interpreter path inside a virtual environment
pub fn venv_python(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

async fn run(command: ToolCommand) -> Result<ToolOutput> {
    command.run().await.map_err(|e| {
        ProvisioningError::Spawn {
            command: command.display(),
            reason: e.to_string(),
        }
        .into()
    })
}
