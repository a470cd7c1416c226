//! The effectful pipeline steps, and their implementation over git, Python,
//! and the build and upload tools.

use crate::build::{self, BuildArtifactSet};
use crate::config::{PipelineConfig, RuntimeSpec};
use crate::environment::{self, ProvisionedEnvironment};
use crate::error::Result;
use crate::publish::{self, Credential, PublishReceipt, PublishTarget};
use crate::source::{self, RepositorySource, SourceTree};
use crate::trigger::TriggerEvent;
use crate::workdir::WorkDir;
use std::path::PathBuf;
use std::sync::OnceLock;

/// The four steps a run sequences.
///
/// Implementations perform the side effects; ordering, target selection and
/// failure handling live in [`super::ReleasePipeline`].
#[allow(async_fn_in_trait)]
pub trait PipelineSteps {
    /// Retrieve the source tree at the commit `trigger` refers to
    async fn acquire_source(&self, trigger: &TriggerEvent) -> Result<SourceTree>;

    /// Prepare an environment satisfying `spec`
    async fn provision_environment(&self, spec: &RuntimeSpec) -> Result<ProvisionedEnvironment>;

    /// Produce distributable artifacts from `source`
    async fn build(
        &self,
        environment: &ProvisionedEnvironment,
        source: &SourceTree,
    ) -> Result<BuildArtifactSet>;

    /// Upload every artifact to `target`
    async fn publish(
        &self,
        environment: &ProvisionedEnvironment,
        artifacts: &BuildArtifactSet,
        target: &PublishTarget,
        credential: Option<&Credential>,
    ) -> Result<PublishReceipt>;
}

/// Steps backed by external tools, isolated in a per-run working directory.
///
/// The repository source is resolved and the working directory created when
/// the source is acquired, so a failure there is recorded against that step.
#[derive(Debug)]
pub struct ToolchainSteps {
    repository: String,
    submodules: bool,
    work_root: Option<PathBuf>,
    keep_work_dir: bool,
    work_dir: OnceLock<WorkDir>,
}

impl ToolchainSteps {
    /// Create steps for `config`
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            repository: config
                .source
                .repository
                .clone()
                .unwrap_or_else(|| ".".to_string()),
            submodules: config.source.submodules,
            work_root: config.source.work_dir.clone(),
            keep_work_dir: config.source.keep_work_dir,
            work_dir: OnceLock::new(),
        }
    }

    /// Working directory of the run, once the source has been acquired
    pub fn work_dir(&self) -> Option<&WorkDir> {
        self.work_dir.get()
    }

    fn prepare_work_dir(&self) -> Result<&WorkDir> {
        if let Some(work_dir) = self.work_dir.get() {
            return Ok(work_dir);
        }
        let created = WorkDir::create(self.work_root.as_deref(), self.keep_work_dir)?;
        Ok(self.work_dir.get_or_init(|| created))
    }
}

impl PipelineSteps for ToolchainSteps {
    async fn acquire_source(&self, trigger: &TriggerEvent) -> Result<SourceTree> {
        let source = RepositorySource::parse(&self.repository)?;
        let work_dir = self.prepare_work_dir()?;
        log::info!(
            "acquiring {} in {}",
            source.clone_url(),
            work_dir.path().display()
        );
        source::acquire(&source, trigger, &work_dir.source_dir(), self.submodules).await
    }

    async fn provision_environment(&self, spec: &RuntimeSpec) -> Result<ProvisionedEnvironment> {
        let work_dir = self.prepare_work_dir()?;
        environment::provision(spec, &work_dir.venv_dir()).await
    }

    async fn build(
        &self,
        environment: &ProvisionedEnvironment,
        source: &SourceTree,
    ) -> Result<BuildArtifactSet> {
        build::build(environment, source).await
    }

    async fn publish(
        &self,
        environment: &ProvisionedEnvironment,
        artifacts: &BuildArtifactSet,
        target: &PublishTarget,
        credential: Option<&Credential>,
    ) -> Result<PublishReceipt> {
        publish::publish(environment, artifacts, target, credential).await
    }
}
