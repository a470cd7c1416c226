//! # pyrelease
//!
//! Release pipeline for Python packages.
//!
//! One run maps a pushed reference to a build-then-publish sequence:
//!
//! 1. **Acquire source**: clone the repository and check out the pushed
//!    commit, including nested submodules
//! 2. **Provision environment**: find a Python interpreter matching the
//!    version requirement, create a virtual environment, install the tools
//! 3. **Build**: run the package build tool, collect sdists and wheels
//! 4. **Publish**: upload every artifact to exactly one registry
//!
//! Tag references (`refs/tags/*`) publish to the production registry; all
//! other references publish to the staging registry. The first failing step
//! aborts the run and nothing is published.
//!
//! ## Usage
//!
//! ```bash
//! pyrelease run                              # trigger from GITHUB_REF / GITHUB_SHA
//! pyrelease run --ref refs/tags/v1.2.3
//! pyrelease target --ref refs/heads/main
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod source;
pub mod trigger;
pub mod workdir;

// Re-export main types for public API
pub use build::{ArtifactKind, BuildArtifact, BuildArtifactSet};
pub use cli::Args;
pub use config::{PipelineConfig, PublishSettings, RuntimeSpec, SourceSettings};
pub use environment::ProvisionedEnvironment;
pub use error::{
    AcquisitionError, BuildError, ProvisioningError, PublishError, ReleaseError, Result,
};
pub use pipeline::{
    PipelineSteps, ReleasePipeline, RunOutcome, RunReport, RunStatus, Step, StepOutcome,
    ToolchainSteps,
};
pub use publish::{Credential, PublishReceipt, PublishTarget, TargetKind, select_target};
pub use source::{RepositorySource, SourceTree};
pub use trigger::{RefKind, TriggerEvent};
