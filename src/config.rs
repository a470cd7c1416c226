//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then the TOML config file, then
//! `PYRELEASE_*` environment variables, then command line overrides.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Config file looked up in the current directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "pyrelease.toml";

/// Staging registry used when no override is configured
pub const DEFAULT_STAGING_REGISTRY_URL: &str = "https://test.pypi.org/legacy/";

/// Environment variable holding the production registry credential
pub const DEFAULT_PRODUCTION_CREDENTIAL_ENV: &str = "PYPI_API_TOKEN";

/// Environment variable holding the staging registry credential
pub const DEFAULT_STAGING_CREDENTIAL_ENV: &str = "TEST_PYPI_API_TOKEN";

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Source acquisition settings
    pub source: SourceSettings,
    /// Execution environment settings
    pub runtime: RuntimeSpec,
    /// Publish settings
    pub publish: PublishSettings,
}

/// Where the source tree comes from and where it is checked out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// Local path, GitHub URL, or `owner/repo`; defaults to the current directory
    pub repository: Option<String>,
    /// Initialize nested submodules recursively after checkout
    pub submodules: bool,
    /// Parent directory for per-run working directories
    pub work_dir: Option<PathBuf>,
    /// Leave the working directory in place after the run
    pub keep_work_dir: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            repository: None,
            submodules: true,
            work_dir: None,
            keep_work_dir: false,
        }
    }
}

/// Declared runtime requirement for the execution environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSpec {
    /// Python version requirement, e.g. `>=3.8` or `3.x`
    pub python: String,
    /// Interpreter executables probed in order
    pub interpreters: Vec<String>,
    /// Packages installed into the environment before building
    pub tools: Vec<String>,
}

impl Default for RuntimeSpec {
    fn default() -> Self {
        Self {
            python: ">=3.8".to_string(),
            interpreters: vec!["python3".to_string(), "python".to_string()],
            tools: vec!["build".to_string(), "twine".to_string()],
        }
    }
}

/// Registry and credential settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSettings {
    /// Registry for non-tag pushes
    pub staging_registry_url: Url,
    /// Environment variable holding the production credential
    pub production_credential_env: String,
    /// Environment variable holding the staging credential
    pub staging_credential_env: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            staging_registry_url: default_staging_url(),
            production_credential_env: DEFAULT_PRODUCTION_CREDENTIAL_ENV.to_string(),
            staging_credential_env: DEFAULT_STAGING_CREDENTIAL_ENV.to_string(),
        }
    }
}

fn default_staging_url() -> Url {
    Url::parse(DEFAULT_STAGING_REGISTRY_URL).expect("default staging registry URL is valid")
}

/// Values supplied on the command line, highest precedence
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Repository source
    pub repository: Option<String>,
    /// Staging registry URL
    pub registry_url: Option<String>,
    /// Python version requirement
    pub python: Option<String>,
    /// Keep the working directory
    pub keep_work_dir: bool,
}

impl PipelineConfig {
    /// Load configuration from `path`, or from `pyrelease.toml` if it exists.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    }
                    .into());
                }
                Self::from_file(path)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    log::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Self::default()
                }
            }
        };
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply `PYRELEASE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `PYRELEASE_*` overrides using `lookup` to read variables
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = read("PYRELEASE_REGISTRY_URL") {
            self.publish.staging_registry_url = parse_registry_url("PYRELEASE_REGISTRY_URL", &url)?;
        }
        if let Some(python) = read("PYRELEASE_PYTHON") {
            self.runtime.python = python;
        }
        if let Some(repository) = read("PYRELEASE_REPOSITORY") {
            self.source.repository = Some(repository);
        }
        if let Some(work_dir) = read("PYRELEASE_WORK_DIR") {
            self.source.work_dir = Some(PathBuf::from(work_dir));
        }
        Ok(())
    }

    /// Apply command line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(ref url) = overrides.registry_url {
            self.publish.staging_registry_url = parse_registry_url("--registry-url", url)?;
        }
        if let Some(ref python) = overrides.python {
            self.runtime.python = python.clone();
        }
        if let Some(ref repository) = overrides.repository {
            self.source.repository = Some(repository.clone());
        }
        if overrides.keep_work_dir {
            self.source.keep_work_dir = true;
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        semver::VersionReq::parse(&self.runtime.python).map_err(|e| ConfigError::InvalidValue {
            key: "runtime.python".to_string(),
            reason: format!("'{}': {}", self.runtime.python, e),
        })?;

        if self.runtime.interpreters.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "runtime.interpreters".to_string(),
                reason: "at least one interpreter name is required".to_string(),
            }
            .into());
        }

        check_registry_scheme("publish.staging_registry_url", &self.publish.staging_registry_url)?;

        for (key, value) in [
            ("publish.production_credential_env", &self.publish.production_credential_env),
            ("publish.staging_credential_env", &self.publish.staging_credential_env),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "environment variable name must not be empty".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn parse_registry_url(key: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("'{value}': {e}"),
    })?;
    check_registry_scheme(key, &url)?;
    Ok(url)
}

fn check_registry_scheme(key: &str, url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("unsupported scheme '{other}' in {url}"),
        }
        .into()),
    }
}
