//! Upload through `python -m twine upload`.

use super::{Credential, PublishTarget, TargetKind};
use crate::build::BuildArtifactSet;
use crate::environment::ProvisionedEnvironment;
use crate::error::{PublishError, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Username the upload tool expects for API-token authentication
const TOKEN_USERNAME: &str = "__token__";

static DUPLICATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)file already exists|already been (taken|used)|400 .*exists")
        .expect("duplicate upload regex is valid")
});

static AUTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b40[13]\b|invalid or non-existent authentication|authentication failed|forbidden")
        .expect("auth failure regex is valid")
});

static NETWORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)connectionerror|max retries exceeded|name or service not known|temporary failure in name resolution|timed out|connection (refused|reset)",
    )
    .expect("network failure regex is valid")
});

/// What a successful publish uploaded, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    /// Target kind
    pub target: TargetKind,
    /// Registry URL uploaded to
    pub registry: String,
    /// Uploaded file names, in upload order
    pub uploaded: Vec<String>,
}

/// Upload every artifact in `artifacts` to `target`.
///
/// A missing credential fails before the upload tool is started. Repository
/// selection inherited from the environment is stripped, so the upload goes
/// exactly where `target` says. Existing
/// files are never skipped or overwritten: the registry's duplicate rejection
/// surfaces as [`PublishError::AlreadyPublished`].
pub async fn publish(
    environment: &ProvisionedEnvironment,
    artifacts: &BuildArtifactSet,
    target: &PublishTarget,
    credential: Option<&Credential>,
) -> Result<PublishReceipt> {
    if artifacts.is_empty() {
        return Err(PublishError::EmptyArtifactSet.into());
    }

    let credential = credential.ok_or_else(|| PublishError::MissingCredential {
        target: target.kind.to_string(),
        env_var: target.credential_env.clone(),
    })?;

    let mut command = environment
        .module_command("twine")
        .args(["upload", "--non-interactive"]);
    if let Some(ref url) = target.registry_url {
        command = command.args(["--repository-url", url.as_str()]);
    }
    let command = command
        .args(artifacts.paths().map(|p| p.as_os_str()))
        .env_remove("TWINE_REPOSITORY_URL")
        .env_remove("TWINE_REPOSITORY")
        .env("TWINE_USERNAME", TOKEN_USERNAME)
        .secret_env("TWINE_PASSWORD", credential.expose());

    log::info!(
        "uploading {} artifact(s) to {}",
        artifacts.len(),
        target
    );

    let output = command.run().await.map_err(|e| PublishError::Spawn {
        command: command.display(),
        reason: e.to_string(),
    })?;

    if !output.success {
        return Err(classify_upload_failure(target.registry(), &output.diagnostics()).into());
    }

    Ok(PublishReceipt {
        target: target.kind,
        registry: target.registry().to_string(),
        uploaded: artifacts
            .file_names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

/// Map upload tool output to the matching [`PublishError`]
pub fn classify_upload_failure(registry: &str, output: &str) -> PublishError {
    let registry = registry.to_string();
    let output = output.to_string();
    if DUPLICATE_RE.is_match(&output) {
        PublishError::AlreadyPublished { registry, output }
    } else if AUTH_RE.is_match(&output) {
        PublishError::AuthenticationFailed { registry, output }
    } else if NETWORK_RE.is_match(&output) {
        PublishError::NetworkError { registry, output }
    } else {
        PublishError::UploadFailed { registry, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ArtifactKind, BuildArtifact};
    use std::path::PathBuf;

    const REGISTRY: &str = "https://upload.pypi.org/legacy/";

    fn environment() -> ProvisionedEnvironment {
        ProvisionedEnvironment {
            python: PathBuf::from("/nonexistent/venv/bin/python"),
            version: semver::Version::new(3, 11, 4),
            base_interpreter: PathBuf::from("/usr/bin/python3"),
            venv: PathBuf::from("/nonexistent/venv"),
        }
    }

    fn artifacts() -> BuildArtifactSet {
        BuildArtifactSet::new(vec![BuildArtifact {
            path: PathBuf::from("/nonexistent/dist/pkg-1.0.tar.gz"),
            file_name: "pkg-1.0.tar.gz".to_string(),
            kind: ArtifactKind::Sdist,
            size: 10,
            sha256: "00".repeat(32),
        }])
    }

    #[test]
    fn duplicate_upload_is_already_published() {
        let err = classify_upload_failure(
            REGISTRY,
            "ERROR    HTTPError: 400 Bad Request from https://upload.pypi.org/legacy/\n         File already exists.",
        );
        assert!(matches!(err, PublishError::AlreadyPublished { .. }));
    }

    #[test]
    fn rejected_token_is_authentication_failure() {
        let err = classify_upload_failure(
            REGISTRY,
            "ERROR    HTTPError: 403 Forbidden from https://upload.pypi.org/legacy/\n         Invalid or non-existent authentication information.",
        );
        assert!(matches!(err, PublishError::AuthenticationFailed { .. }));
    }

    #[test]
    fn connection_failure_is_network_error() {
        let err = classify_upload_failure(
            REGISTRY,
            "requests.exceptions.ConnectionError: HTTPSConnectionPool(host='upload.pypi.org', port=443): Max retries exceeded",
        );
        assert!(matches!(err, PublishError::NetworkError { .. }));
    }

    #[test]
    fn other_failures_keep_output_verbatim() {
        let output = "ERROR    InvalidDistribution: Invalid distribution metadata";
        match classify_upload_failure(REGISTRY, output) {
            PublishError::UploadFailed { output: kept, registry } => {
                assert_eq!(kept, output);
                assert_eq!(registry, REGISTRY);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_before_upload() {
        let target = PublishTarget {
            kind: TargetKind::Production,
            registry_url: None,
            credential_env: "PYPI_API_TOKEN".to_string(),
        };
        let err = publish(&environment(), &artifacts(), &target, None)
            .await
            .unwrap_err();
        match err {
            crate::error::ReleaseError::Publish(PublishError::MissingCredential { env_var, target }) => {
                assert_eq!(env_var, "PYPI_API_TOKEN");
                assert_eq!(target, "production");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_set_is_rejected() {
        let target = PublishTarget {
            kind: TargetKind::Staging,
            registry_url: None,
            credential_env: "TEST_PYPI_API_TOKEN".to_string(),
        };
        let credential = Credential::new("token");
        let err = publish(
            &environment(),
            &BuildArtifactSet::default(),
            &target,
            credential.as_ref(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Publish(PublishError::EmptyArtifactSet)
        ));
    }

    /// Environment whose `python` records its arguments and `TWINE_*` variables
    #[cfg(unix)]
    fn recording_environment(dir: &std::path::Path) -> (ProvisionedEnvironment, PathBuf) {
        let log = dir.join("twine.log");
        let python = crate::process::fake_tool::script(
            dir,
            "python",
            &format!(
                "{{ printf '%s\\n' \"$@\"; echo '--env--'; env | grep '^TWINE_' | sort; }} > '{}'",
                log.display()
            ),
        );
        let environment = ProvisionedEnvironment {
            python,
            ..environment()
        };
        (environment, log)
    }

    #[cfg(unix)]
    fn split_log(log: &std::path::Path) -> (Vec<String>, Vec<String>) {
        let text = std::fs::read_to_string(log).unwrap();
        let mut lines = text.lines().map(String::from);
        let args = lines.by_ref().take_while(|l| l != "--env--").collect();
        (args, lines.collect())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn staging_upload_names_repository_and_passes_token_by_env() {
        let dir = tempfile::tempdir().unwrap();
        let (environment, log) = recording_environment(dir.path());
        let target = PublishTarget {
            kind: TargetKind::Staging,
            registry_url: Some(url::Url::parse("https://test.pypi.org/legacy/").unwrap()),
            credential_env: "TEST_PYPI_API_TOKEN".to_string(),
        };
        let credential = Credential::new("pypi-staging-secret");

        let receipt = publish(&environment, &artifacts(), &target, credential.as_ref())
            .await
            .unwrap();
        assert_eq!(receipt.registry, "https://test.pypi.org/legacy/");
        assert_eq!(receipt.uploaded, vec!["pkg-1.0.tar.gz"]);

        let (args, env) = split_log(&log);
        assert_eq!(
            args,
            vec![
                "-m",
                "twine",
                "upload",
                "--non-interactive",
                "--repository-url",
                "https://test.pypi.org/legacy/",
                "/nonexistent/dist/pkg-1.0.tar.gz",
            ]
        );
        assert!(args.iter().all(|a| !a.contains("pypi-staging-secret")));
        assert!(env.contains(&"TWINE_PASSWORD=pypi-staging-secret".to_string()));
        assert!(env.contains(&"TWINE_USERNAME=__token__".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn production_upload_relies_on_tool_default_registry() {
        let dir = tempfile::tempdir().unwrap();
        let (environment, log) = recording_environment(dir.path());
        let target = PublishTarget {
            kind: TargetKind::Production,
            registry_url: None,
            credential_env: "PYPI_API_TOKEN".to_string(),
        };
        let credential = Credential::new("pypi-production-secret");

        let receipt = publish(&environment, &artifacts(), &target, credential.as_ref())
            .await
            .unwrap();
        assert_eq!(receipt.registry, REGISTRY);

        let (args, env) = split_log(&log);
        assert!(!args.iter().any(|a| a == "--repository-url"));
        assert!(
            env.iter().all(|line| !line.starts_with("TWINE_REPOSITORY")),
            "{env:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejected_upload_keeps_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let python = crate::process::fake_tool::script(
            dir.path(),
            "python",
            "echo 'HTTPError: 400 Bad Request from https://upload.pypi.org/legacy/' >&2\necho 'File already exists.' >&2\nexit 1",
        );
        let environment = ProvisionedEnvironment {
            python,
            ..environment()
        };
        let target = PublishTarget {
            kind: TargetKind::Production,
            registry_url: None,
            credential_env: "PYPI_API_TOKEN".to_string(),
        };
        let credential = Credential::new("token");

        let err = publish(&environment, &artifacts(), &target, credential.as_ref())
            .await
            .unwrap_err();
        match err {
            crate::error::ReleaseError::Publish(PublishError::AlreadyPublished { output, .. }) => {
                assert_eq!(
                    output,
                    "HTTPError: 400 Bad Request from https://upload.pypi.org/legacy/\nFile already exists."
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
