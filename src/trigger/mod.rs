//! Trigger events: the pushed reference that starts a pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of fully-qualified tag references
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// Prefix of fully-qualified branch references
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Classification of a pushed reference.
///
/// Every reference is exactly one of these: anything that is not a tag is
/// treated as a branch push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// Branch, pull request, or any other non-tag reference
    Branch,
    /// Tag reference marking a release point
    Tag,
}

impl RefKind {
    /// Classify a reference name
    pub fn classify(reference: &str) -> Self {
        if reference.starts_with(TAG_REF_PREFIX) {
            RefKind::Tag
        } else {
            RefKind::Branch
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Branch => write!(f, "branch"),
            RefKind::Tag => write!(f, "tag"),
        }
    }
}

/// The push that started a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Full reference name, e.g. `refs/heads/main` or `refs/tags/v1.2.3`
    pub reference: String,
    /// Reference classification
    pub kind: RefKind,
    /// Commit the reference pointed at when pushed, if the host reported it
    pub revision: Option<String>,
}

impl TriggerEvent {
    /// Build a trigger from a reference name and optional commit
    pub fn new(reference: impl Into<String>, revision: Option<String>) -> Self {
        let reference = reference.into();
        let kind = RefKind::classify(&reference);
        let revision = revision
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Self {
            reference,
            kind,
            revision,
        }
    }

    /// Whether this push is a tag reference
    pub fn is_tag(&self) -> bool {
        self.kind == RefKind::Tag
    }

    /// Reference name without its `refs/heads/` or `refs/tags/` prefix
    pub fn short_name(&self) -> &str {
        self.reference
            .strip_prefix(TAG_REF_PREFIX)
            .or_else(|| self.reference.strip_prefix(BRANCH_REF_PREFIX))
            .unwrap_or(&self.reference)
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.reference)?;
        if let Some(ref revision) = self.revision {
            let short = revision.get(..12).unwrap_or(revision);
            write!(f, " @ {short}")?;
        }
        Ok(())
    }
}
