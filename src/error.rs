//! Error types for release pipeline runs.
//!
//! Each pipeline step owns one error enum. Step errors carry the failed command
//! and the external tool's output verbatim so the run log shows exactly what
//! the tool reported.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pyrelease operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all pyrelease operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Source acquisition errors
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Environment provisioning errors
    #[error("Provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    /// Package build errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while retrieving the source tree
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Repository source string could not be interpreted
    #[error("Invalid source '{source_spec}': use a local path, GitHub URL, or owner/repo")]
    InvalidSource {
        /// Source string as given
        source_spec: String,
    },

    /// Clone of the repository failed
    #[error("Failed to clone {url}: {output}")]
    CloneFailed {
        /// Clone URL or path
        url: String,
        /// Tool output
        output: String,
    },

    /// Trigger reference could not be fetched or resolved
    #[error("Reference '{reference}' could not be resolved: {output}")]
    UnresolvedReference {
        /// Reference or revision
        reference: String,
        /// Tool output
        output: String,
    },

    /// Submodule update failed
    #[error("Failed to update submodules: {output}")]
    SubmodulesFailed {
        /// Tool output
        output: String,
    },

    /// Working directory could not be prepared
    #[error("Failed to prepare working directory {path}: {reason}")]
    WorkDir {
        /// Working directory path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// git could not be launched
    #[error("Command '{command}' could not be started: {reason}")]
    Spawn {
        /// Command line
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised while preparing the execution environment
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// Runtime version requirement could not be parsed
    #[error("Invalid Python version requirement '{requirement}': {reason}")]
    InvalidRequirement {
        /// Requirement string
        requirement: String,
        /// Reason for the error
        reason: String,
    },

    /// No interpreter on PATH satisfies the requirement
    #[error("No Python interpreter satisfies '{requirement}' (found: {found})")]
    NoMatchingInterpreter {
        /// Requirement string
        requirement: String,
        /// Interpreters that were probed, with their versions
        found: String,
    },

    /// Virtual environment creation failed
    #[error("Failed to create virtual environment at {path}: {output}")]
    VenvFailed {
        /// Venv location
        path: PathBuf,
        /// Tool output
        output: String,
    },

    /// Build or upload tool installation failed
    #[error("Failed to install {tools}: {output}")]
    ToolInstallFailed {
        /// Packages being installed
        tools: String,
        /// Tool output
        output: String,
    },

    /// Interpreter could not be launched
    #[error("Command '{command}' could not be started: {reason}")]
    Spawn {
        /// Command line
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised by the package build step
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build tool exited with failure
    #[error("'{command}' failed: {output}")]
    ToolFailed {
        /// Command line
        command: String,
        /// Tool output
        output: String,
    },

    /// Build tool succeeded but wrote nothing
    #[error("Build produced no distributable artifacts in {dist_dir}")]
    NoArtifacts {
        /// Output location that was scanned
        dist_dir: PathBuf,
    },

    /// Output location could not be read or cleaned
    #[error("Failed to access build output {path}: {reason}")]
    Output {
        /// Path being accessed
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Build tool could not be launched
    #[error("Command '{command}' could not be started: {reason}")]
    Spawn {
        /// Command line
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised by the publish step
#[derive(Error, Debug)]
pub enum PublishError {
    /// Credential for the selected target is not configured
    #[error("No credential for {target} registry: set the {env_var} environment variable")]
    MissingCredential {
        /// Target name
        target: String,
        /// Environment variable holding the credential
        env_var: String,
    },

    /// Registry rejected the credential
    #[error("Authentication to {registry} failed: {output}")]
    AuthenticationFailed {
        /// Registry URL
        registry: String,
        /// Tool output
        output: String,
    },

    /// Artifact version already exists on the registry
    #[error("Artifact already published to {registry}: {output}")]
    AlreadyPublished {
        /// Registry URL
        registry: String,
        /// Tool output
        output: String,
    },

    /// Network failure while uploading
    #[error("Network error uploading to {registry}: {output}")]
    NetworkError {
        /// Registry URL
        registry: String,
        /// Tool output
        output: String,
    },

    /// Any other upload rejection
    #[error("Upload to {registry} failed: {output}")]
    UploadFailed {
        /// Registry URL
        registry: String,
        /// Tool output
        output: String,
    },

    /// Nothing to upload
    #[error("Artifact set is empty")]
    EmptyArtifactSet,

    /// Upload tool could not be launched
    #[error("Command '{command}' could not be started: {reason}")]
    Spawn {
        /// Command line
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Explicitly named config file is missing
    #[error("Config file not found: {path}")]
    NotFound {
        /// Config path
        path: PathBuf,
    },

    /// Config file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// A value is malformed
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Config key
        key: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl ReleaseError {
    /// Name of the pipeline step this error aborted, if any
    pub fn step(&self) -> Option<&'static str> {
        match self {
            ReleaseError::Acquisition(_) => Some("acquire_source"),
            ReleaseError::Provisioning(_) => Some("provision_environment"),
            ReleaseError::Build(_) => Some("build"),
            ReleaseError::Publish(_) => Some("publish"),
            _ => None,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Acquisition(AcquisitionError::UnresolvedReference { reference, .. }) => {
                vec![
                    format!("Verify that '{}' exists on the remote", reference),
                    "Push the branch or tag before starting the run".to_string(),
                ]
            }
            ReleaseError::Acquisition(AcquisitionError::SubmodulesFailed { .. }) => vec![
                "Check .gitmodules URLs are reachable from this host".to_string(),
                "Set submodules = false under [source] if the package has none".to_string(),
            ],
            ReleaseError::Provisioning(ProvisioningError::NoMatchingInterpreter {
                requirement,
                ..
            }) => vec![
                format!("Install a Python interpreter matching '{}'", requirement),
                "Relax the requirement with --python or PYRELEASE_PYTHON".to_string(),
            ],
            ReleaseError::Build(BuildError::NoArtifacts { .. }) => vec![
                "Ensure pyproject.toml or setup.py declares a buildable package".to_string(),
            ],
            ReleaseError::Publish(PublishError::MissingCredential { env_var, .. }) => vec![
                format!("Export an API token in {}", env_var),
                "Configure the secret in the CI host's repository settings".to_string(),
            ],
            ReleaseError::Publish(PublishError::AuthenticationFailed { .. }) => vec![
                "Verify the API token is valid and scoped to this project".to_string(),
            ],
            ReleaseError::Publish(PublishError::AlreadyPublished { .. }) => vec![
                "Bump the package version before publishing again".to_string(),
                "Registries never allow overwriting an existing file".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_follow_pipeline_order() {
        let acquisition = ReleaseError::from(AcquisitionError::SubmodulesFailed {
            output: String::new(),
        });
        let build = ReleaseError::from(BuildError::NoArtifacts {
            dist_dir: PathBuf::from("dist"),
        });
        let publish = ReleaseError::from(PublishError::EmptyArtifactSet);
        let config = ReleaseError::from(ConfigError::NotFound {
            path: PathBuf::from("pyrelease.toml"),
        });

        assert_eq!(acquisition.step(), Some("acquire_source"));
        assert_eq!(build.step(), Some("build"));
        assert_eq!(publish.step(), Some("publish"));
        assert_eq!(config.step(), None);
    }

    #[test]
    fn missing_credential_suggests_env_var() {
        let err = ReleaseError::from(PublishError::MissingCredential {
            target: "production".to_string(),
            env_var: "PYPI_API_TOKEN".to_string(),
        });
        let suggestions = err.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("PYPI_API_TOKEN")));
    }
}
