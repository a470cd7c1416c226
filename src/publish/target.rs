//! Publish target selection.

use crate::config::PublishSettings;
use crate::trigger::TriggerEvent;
use serde::Serialize;
use std::fmt;
use url::Url;

/// Upload endpoint the upload tool uses when no repository URL is passed
pub const PRODUCTION_REGISTRY_URL: &str = "https://upload.pypi.org/legacy/";

/// Which registry a run publishes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Test/staging registry, for non-tag pushes
    Staging,
    /// Production registry, for tag pushes
    Production,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Staging => write!(f, "staging"),
            TargetKind::Production => write!(f, "production"),
        }
    }
}

/// Destination registry for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishTarget {
    /// Staging or production
    pub kind: TargetKind,
    /// Repository URL passed to the upload tool; `None` uses its built-in production default
    pub registry_url: Option<Url>,
    /// Environment variable the credential is read from
    pub credential_env: String,
}

impl PublishTarget {
    /// Registry URL as it will actually be used
    pub fn registry(&self) -> &str {
        self.registry_url
            .as_ref()
            .map(Url::as_str)
            .unwrap_or(PRODUCTION_REGISTRY_URL)
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.registry())
    }
}

/// Select the registry for `trigger`: production for tag references, staging otherwise
pub fn select_target(trigger: &TriggerEvent, settings: &PublishSettings) -> PublishTarget {
    if trigger.is_tag() {
        PublishTarget {
            kind: TargetKind::Production,
            registry_url: None,
            credential_env: settings.production_credential_env.clone(),
        }
    } else {
        PublishTarget {
            kind: TargetKind::Staging,
            registry_url: Some(settings.staging_registry_url.clone()),
            credential_env: settings.staging_credential_env.clone(),
        }
    }
}
