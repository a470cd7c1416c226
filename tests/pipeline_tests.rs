use pyrelease::cli::RuntimeConfig;
use pyrelease::error::{BuildError, PublishError, ReleaseError, Result};
use pyrelease::pipeline::{PipelineSteps, ReleasePipeline, RunStatus, Step, StepOutcome};
use pyrelease::publish::{Credential, PublishReceipt, PublishTarget, TargetKind};
use pyrelease::{
    ArtifactKind, BuildArtifact, BuildArtifactSet, PipelineConfig, ProvisionedEnvironment,
    RuntimeSpec, SourceTree, TriggerEvent,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Acquire,
    Provision,
    Build,
    Publish(TargetKind),
}

#[derive(Default)]
struct RecordingSteps {
    calls: Mutex<Vec<Call>>,
    published_to: Mutex<Vec<String>>,
    fail_acquire: bool,
    fail_build: bool,
    publish_output: Option<&'static str>,
}

impl RecordingSteps {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| call(c)).count()
    }

    fn environment() -> ProvisionedEnvironment {
        ProvisionedEnvironment {
            python: PathBuf::from("/nonexistent/venv/bin/python"),
            version: semver::Version::new(3, 11, 4),
            base_interpreter: PathBuf::from("/usr/bin/python3"),
            venv: PathBuf::from("/nonexistent/venv"),
        }
    }
}

impl PipelineSteps for RecordingSteps {
    async fn acquire_source(&self, trigger: &TriggerEvent) -> Result<SourceTree> {
        self.calls.lock().unwrap().push(Call::Acquire);
        if self.fail_acquire {
            return Err(pyrelease::AcquisitionError::UnresolvedReference {
                reference: trigger.reference.clone(),
                output: "fatal: couldn't find remote ref".to_string(),
            }
            .into());
        }
        Ok(SourceTree {
            path: PathBuf::from("/nonexistent/source"),
            commit: "0123456789abcdef0123456789abcdef01234567".to_string(),
            submodules: true,
        })
    }

    async fn provision_environment(&self, _spec: &RuntimeSpec) -> Result<ProvisionedEnvironment> {
        self.calls.lock().unwrap().push(Call::Provision);
        Ok(Self::environment())
    }

    async fn build(
        &self,
        _environment: &ProvisionedEnvironment,
        _source: &SourceTree,
    ) -> Result<BuildArtifactSet> {
        self.calls.lock().unwrap().push(Call::Build);
        if self.fail_build {
            return Err(BuildError::ToolFailed {
                command: "python -m build".to_string(),
                output: "ERROR Backend subprocess exited when trying to invoke build_sdist".to_string(),
            }
            .into());
        }
        Ok(BuildArtifactSet::new(vec![
            BuildArtifact {
                path: PathBuf::from("/nonexistent/source/dist/pkg-1.2.3-py3-none-any.whl"),
                file_name: "pkg-1.2.3-py3-none-any.whl".to_string(),
                kind: ArtifactKind::Wheel,
                size: 2048,
                sha256: "ab".repeat(32),
            },
            BuildArtifact {
                path: PathBuf::from("/nonexistent/source/dist/pkg-1.2.3.tar.gz"),
                file_name: "pkg-1.2.3.tar.gz".to_string(),
                kind: ArtifactKind::Sdist,
                size: 1024,
                sha256: "cd".repeat(32),
            },
        ]))
    }

    async fn publish(
        &self,
        environment: &ProvisionedEnvironment,
        artifacts: &BuildArtifactSet,
        target: &PublishTarget,
        credential: Option<&Credential>,
    ) -> Result<PublishReceipt> {
        self.calls.lock().unwrap().push(Call::Publish(target.kind));

        // A missing credential must fail before any upload is attempted
        if credential.is_none() {
            return pyrelease::publish::publish(environment, artifacts, target, None).await;
        }
        if let Some(output) = self.publish_output {
            return Err(pyrelease::publish::classify_upload_failure(target.registry(), output).into());
        }

        self.published_to
            .lock()
            .unwrap()
            .push(target.registry().to_string());
        Ok(PublishReceipt {
            target: target.kind,
            registry: target.registry().to_string(),
            uploaded: artifacts.file_names().into_iter().map(String::from).collect(),
        })
    }
}

fn all_credentials(_var: &str) -> Option<Credential> {
    Credential::new("pypi-test-token")
}

fn pipeline(steps: RecordingSteps) -> ReleasePipeline<RecordingSteps> {
    ReleasePipeline::new(PipelineConfig::default(), steps).with_credentials(all_credentials)
}

#[tokio::test]
async fn branch_push_publishes_only_to_staging() {
    let pipeline = pipeline(RecordingSteps::default());
    let outcome = pipeline
        .run(TriggerEvent::new("refs/heads/main", None), &RuntimeConfig::quiet())
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        pipeline.steps().calls(),
        vec![
            Call::Acquire,
            Call::Provision,
            Call::Build,
            Call::Publish(TargetKind::Staging)
        ]
    );
    assert_eq!(
        *pipeline.steps().published_to.lock().unwrap(),
        vec!["https://test.pypi.org/legacy/".to_string()]
    );
    assert_eq!(outcome.report.status, RunStatus::Success);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn tag_push_publishes_only_to_production() {
    let pipeline = pipeline(RecordingSteps::default());
    let outcome = pipeline
        .run(
            TriggerEvent::new("refs/tags/v1.2.3", Some("0123456789abcdef".to_string())),
            &RuntimeConfig::quiet(),
        )
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        *pipeline.steps().published_to.lock().unwrap(),
        vec!["https://upload.pypi.org/legacy/".to_string()]
    );

    let receipt = outcome.report.receipt.expect("receipt recorded");
    assert_eq!(receipt.target, TargetKind::Production);
    // Upload order puts the sdist first
    assert_eq!(receipt.uploaded, vec!["pkg-1.2.3.tar.gz", "pkg-1.2.3-py3-none-any.whl"]);
}

#[tokio::test]
async fn build_runs_exactly_once_for_either_target() {
    for reference in ["refs/heads/feature/x", "refs/tags/v0.9.0"] {
        let pipeline = pipeline(RecordingSteps::default());
        pipeline
            .run(TriggerEvent::new(reference, None), &RuntimeConfig::quiet())
            .await;
        assert_eq!(pipeline.steps().count(|c| *c == Call::Build), 1, "{reference}");
        assert_eq!(
            pipeline.steps().count(|c| matches!(c, Call::Publish(_))),
            1,
            "{reference}"
        );
    }
}

#[tokio::test]
async fn build_failure_aborts_before_publish() {
    let pipeline = pipeline(RecordingSteps {
        fail_build: true,
        ..Default::default()
    });
    let outcome = pipeline
        .run(TriggerEvent::new("refs/tags/v1.2.3", None), &RuntimeConfig::quiet())
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.error, Some(ReleaseError::Build(_))));
    assert_eq!(pipeline.steps().count(|c| matches!(c, Call::Publish(_))), 0);

    let report = &outcome.report;
    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.failed_step, Some(Step::Build));
    assert_eq!(report.target, None);
    assert_eq!(report.outcome(Step::Publish), Some(StepOutcome::Skipped));
    assert!(report.error.as_deref().unwrap_or_default().contains("build_sdist"));
}

#[tokio::test]
async fn acquisition_failure_skips_everything_after_it() {
    let pipeline = pipeline(RecordingSteps {
        fail_acquire: true,
        ..Default::default()
    });
    let outcome = pipeline
        .run(TriggerEvent::new("refs/heads/gone", None), &RuntimeConfig::quiet())
        .await;

    assert_eq!(pipeline.steps().calls(), vec![Call::Acquire]);
    assert_eq!(outcome.report.failed_step, Some(Step::AcquireSource));
    for step in [Step::ProvisionEnvironment, Step::Build, Step::SelectTarget, Step::Publish] {
        assert_eq!(outcome.report.outcome(step), Some(StepOutcome::Skipped), "{step}");
    }
}

#[tokio::test]
async fn missing_production_credential_fails_publish() {
    let pipeline = ReleasePipeline::new(PipelineConfig::default(), RecordingSteps::default())
        .with_credentials(|var| {
            // Only the staging token is configured
            (var == "TEST_PYPI_API_TOKEN")
                .then(|| Credential::new("pypi-staging"))
                .flatten()
        });
    let outcome = pipeline
        .run(TriggerEvent::new("refs/tags/v1.2.3", None), &RuntimeConfig::quiet())
        .await;

    match outcome.error {
        Some(ReleaseError::Publish(PublishError::MissingCredential { ref env_var, .. })) => {
            assert_eq!(env_var, "PYPI_API_TOKEN");
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert_eq!(outcome.report.failed_step, Some(Step::Publish));
    assert_eq!(outcome.report.status, RunStatus::Failure);
    assert!(pipeline.steps().published_to.lock().unwrap().is_empty());
}

#[tokio::test]
async fn credential_is_looked_up_by_target_variable() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let pipeline = ReleasePipeline::new(PipelineConfig::default(), RecordingSteps::default())
        .with_credentials(move |var| {
            recorded.lock().unwrap().push(var.to_string());
            Credential::new("token")
        });

    pipeline
        .run(TriggerEvent::new("refs/heads/main", None), &RuntimeConfig::quiet())
        .await;
    pipeline
        .run(TriggerEvent::new("refs/tags/v2.0.0", None), &RuntimeConfig::quiet())
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["TEST_PYPI_API_TOKEN".to_string(), "PYPI_API_TOKEN".to_string()]
    );
}

#[tokio::test]
async fn rerunning_a_published_tag_reports_duplicate() {
    let pipeline = pipeline(RecordingSteps {
        publish_output: Some(
            "ERROR    HTTPError: 400 Bad Request from https://upload.pypi.org/legacy/\n         File already exists. See https://pypi.org/help/#file-name-reuse for more information.",
        ),
        ..Default::default()
    });
    let outcome = pipeline
        .run(TriggerEvent::new("refs/tags/v1.2.3", None), &RuntimeConfig::quiet())
        .await;

    assert!(matches!(
        outcome.error,
        Some(ReleaseError::Publish(PublishError::AlreadyPublished { .. }))
    ));
    assert_eq!(outcome.report.failed_step, Some(Step::Publish));
}

#[tokio::test]
async fn report_serializes_for_ci_logs() {
    let pipeline = pipeline(RecordingSteps::default());
    let outcome = pipeline
        .run(TriggerEvent::new("refs/heads/main", None), &RuntimeConfig::quiet())
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    outcome.report.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["target"]["kind"], "staging");
    assert_eq!(json["artifacts"][0]["kind"], "sdist");
    assert_eq!(json["python"], "3.11.4");
}
