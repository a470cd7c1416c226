//! Release pipeline orchestration.
//!
//! A run is strictly sequential: acquire source, provision environment,
//! build, select target, publish. The first failing step aborts the run;
//! nothing after it executes, and nothing is retried or rolled back.

mod report;
mod steps;

pub use report::{RunReport, RunStatus, Step, StepOutcome, StepRecord};
pub use steps::{PipelineSteps, ToolchainSteps};

use crate::cli::RuntimeConfig;
use crate::config::PipelineConfig;
use crate::error::{ReleaseError, Result};
use crate::publish::{Credential, select_target};
use crate::trigger::TriggerEvent;
use std::future::Future;
use std::time::Instant;

type CredentialLookup = Box<dyn Fn(&str) -> Option<Credential> + Send + Sync>;

/// Finished run: the report, plus the error that aborted it
#[derive(Debug)]
pub struct RunOutcome {
    /// Step-by-step report
    pub report: RunReport,
    /// Error of the failed step, surfaced verbatim
    pub error: Option<ReleaseError>,
}

impl RunOutcome {
    /// Whether every step succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Maps a trigger to one build-then-publish sequence
pub struct ReleasePipeline<S> {
    config: PipelineConfig,
    steps: S,
    credentials: CredentialLookup,
}

impl<S: PipelineSteps> ReleasePipeline<S> {
    /// Pipeline reading credentials from the process environment
    pub fn new(config: PipelineConfig, steps: S) -> Self {
        Self {
            config,
            steps,
            credentials: Box::new(Credential::from_env),
        }
    }

    /// Replace the credential lookup (keyed by environment variable name)
    pub fn with_credentials<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Credential> + Send + Sync + 'static,
    {
        self.credentials = Box::new(lookup);
        self
    }

    /// Steps this pipeline drives
    pub fn steps(&self) -> &S {
        &self.steps
    }

    /// Configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one run for `trigger`
    pub async fn run(&self, trigger: TriggerEvent, out: &RuntimeConfig) -> RunOutcome {
        log::info!("pipeline run started for {trigger}");
        let mut report = RunReport::start(trigger.clone());

        let result = self.execute(&trigger, &mut report, out).await;
        let error = result.err();
        report.finish(error.as_ref().map(ToString::to_string));

        match (&error, report.failed_step) {
            (None, _) => log::info!("pipeline run succeeded"),
            (Some(e), Some(step)) => log::error!("step {step} failed: {e}"),
            (Some(e), None) => log::error!("pipeline run failed: {e}"),
        }

        RunOutcome { report, error }
    }

    async fn execute(
        &self,
        trigger: &TriggerEvent,
        report: &mut RunReport,
        out: &RuntimeConfig,
    ) -> Result<()> {
        out.section(&format!("Release {}", trigger));

        out.progress("Acquiring source...");
        let source = timed(report, Step::AcquireSource, self.steps.acquire_source(trigger)).await?;
        report.commit = Some(source.commit.clone());
        out.success_println(&format!("Checked out {}", source.commit));

        out.progress(&format!("Provisioning Python {}...", self.config.runtime.python));
        let environment = timed(
            report,
            Step::ProvisionEnvironment,
            self.steps.provision_environment(&self.config.runtime),
        )
        .await?;
        report.python = Some(environment.version.to_string());
        out.success_println(&format!("Python {} ready", environment.version));

        out.progress("Building distributions...");
        let artifacts = timed(report, Step::Build, self.steps.build(&environment, &source)).await?;
        report.artifacts = artifacts.artifacts().to_vec();
        out.success_println(&format!("Built {} artifact(s)", artifacts.len()));
        for artifact in artifacts.artifacts() {
            out.indent(&format!("{} ({}, {} bytes)", artifact.file_name, artifact.kind, artifact.size));
        }

        let selected = Instant::now();
        let target = select_target(trigger, &self.config.publish);
        report.record(Step::SelectTarget, StepOutcome::Succeeded, selected.elapsed());
        report.target = Some(target.clone());
        out.verbose_println(&format!("{} reference selects {}", trigger.kind, target));

        out.progress(&format!("Publishing to {}...", target));
        let credential = (self.credentials)(&target.credential_env);
        let receipt = timed(
            report,
            Step::Publish,
            self.steps.publish(&environment, &artifacts, &target, credential.as_ref()),
        )
        .await?;
        out.success_println(&format!(
            "Published {} artifact(s) to {}",
            receipt.uploaded.len(),
            receipt.registry
        ));
        report.receipt = Some(receipt);

        Ok(())
    }
}

async fn timed<T, F>(report: &mut RunReport, step: Step, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    log::info!("step {step} started");
    let started = Instant::now();
    let result = future.await;
    let outcome = if result.is_ok() {
        StepOutcome::Succeeded
    } else {
        StepOutcome::Failed
    };
    report.record(step, outcome, started.elapsed());
    result
}
