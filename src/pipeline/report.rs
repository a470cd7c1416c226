//! Run report: what each step did, serializable for CI logs.

use crate::build::BuildArtifact;
use crate::error::Result;
use crate::publish::{PublishReceipt, PublishTarget};
use crate::trigger::TriggerEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Pipeline steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Source checkout
    AcquireSource,
    /// Interpreter, venv, and tools
    ProvisionEnvironment,
    /// Artifact build
    Build,
    /// Registry choice
    SelectTarget,
    /// Upload
    Publish,
}

impl Step {
    /// All steps in execution order
    pub const ALL: [Step; 5] = [
        Step::AcquireSource,
        Step::ProvisionEnvironment,
        Step::Build,
        Step::SelectTarget,
        Step::Publish,
    ];

    /// Step name as used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::AcquireSource => "acquire_source",
            Step::ProvisionEnvironment => "provision_environment",
            Step::Build => "build",
            Step::SelectTarget => "select_target",
            Step::Publish => "publish",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    /// Completed without error
    Succeeded,
    /// Aborted the run
    Failed,
    /// Not attempted because an earlier step failed
    Skipped,
}

/// One step's outcome and duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step
    pub step: Step,
    /// Outcome
    pub outcome: StepOutcome,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every step succeeded
    Success,
    /// A step failed
    Failure,
}

/// Everything known about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Trigger that started the run
    pub trigger: TriggerEvent,
    /// Overall status
    pub status: RunStatus,
    /// Step that aborted the run
    pub failed_step: Option<Step>,
    /// Error message of the failed step, including tool output
    pub error: Option<String>,
    /// Commit that was built
    pub commit: Option<String>,
    /// Interpreter version used
    pub python: Option<String>,
    /// Built artifacts in upload order
    pub artifacts: Vec<BuildArtifact>,
    /// Selected registry
    pub target: Option<PublishTarget>,
    /// Upload result
    pub receipt: Option<PublishReceipt>,
    /// Per-step records in execution order
    pub steps: Vec<StepRecord>,
    /// Run start time
    pub started_at: DateTime<Utc>,
    /// Run end time
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Empty report for a run that is starting now
    pub fn start(trigger: TriggerEvent) -> Self {
        Self {
            trigger,
            status: RunStatus::Failure,
            failed_step: None,
            error: None,
            commit: None,
            python: None,
            artifacts: Vec::new(),
            target: None,
            receipt: None,
            steps: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record the outcome of `step`
    pub fn record(&mut self, step: Step, outcome: StepOutcome, elapsed: Duration) {
        if outcome == StepOutcome::Failed {
            self.failed_step = Some(step);
        }
        self.steps.push(StepRecord {
            step,
            outcome,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    /// Close the report; steps never reached are marked skipped
    pub fn finish(&mut self, error: Option<String>) {
        for step in Step::ALL {
            if !self.steps.iter().any(|r| r.step == step) {
                self.steps.push(StepRecord {
                    step,
                    outcome: StepOutcome::Skipped,
                    duration_ms: 0,
                });
            }
        }
        self.status = if error.is_none() && self.failed_step.is_none() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        };
        self.error = error;
        self.finished_at = Some(Utc::now());
    }

    /// Outcome recorded for `step`
    pub fn outcome(&self, step: Step) -> Option<StepOutcome> {
        self.steps.iter().find(|r| r.step == step).map(|r| r.outcome)
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
