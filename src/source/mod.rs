//! Source acquisition: repository source resolution, clone, and checkout of
//! the exact commit a trigger refers to, including nested submodules.

use crate::error::{AcquisitionError, Result};
use crate::process::{ToolCommand, ToolOutput};
use crate::trigger::TriggerEvent;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Repository source: local path, GitHub, or any other git remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    /// Repository on the local filesystem
    Local(PathBuf),
    /// Repository hosted on GitHub
    GitHub {
        /// Owner or organization
        owner: String,
        /// Repository name
        repo: String,
    },
    /// Any other clone URL (`https://…`, `ssh://…`, `git@host:path`)
    Remote(String),
}

static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/?$")
        .expect("GitHub URL regex is valid")
});

static OWNER_REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+)$")
        .expect("owner/repo regex is valid")
});

impl RepositorySource {
    /// Parse input string into RepositorySource
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        // Try as local path first
        let path = PathBuf::from(input);
        if !input.is_empty() && path.exists() {
            return path.canonicalize().map(Self::Local).map_err(|e| {
                AcquisitionError::WorkDir {
                    path,
                    reason: e.to_string(),
                }
                .into()
            });
        }

        if let Some(caps) = GITHUB_URL_RE.captures(input) {
            return Ok(Self::GitHub {
                owner: caps["owner"].to_string(),
                repo: caps["repo"].to_string(),
            });
        }

        if input.contains("://") || input.starts_with("git@") {
            return Ok(Self::Remote(input.to_string()));
        }

        if let Some(caps) = OWNER_REPO_RE.captures(input) {
            return Ok(Self::GitHub {
                owner: caps["owner"].to_string(),
                repo: caps["repo"].trim_end_matches(".git").to_string(),
            });
        }

        Err(AcquisitionError::InvalidSource {
            source_spec: input.to_string(),
        }
        .into())
    }

    /// URL or path handed to `git clone`
    pub fn clone_url(&self) -> String {
        match self {
            Self::Local(path) => path.to_string_lossy().into_owned(),
            Self::GitHub { owner, repo } => format!("https://github.com/{owner}/{repo}.git"),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// A checked-out source tree at an exact commit
#[derive(Debug, Clone, Serialize)]
pub struct SourceTree {
    /// Checkout location
    pub path: PathBuf,
    /// Full commit id that is checked out
    pub commit: String,
    /// Whether submodules were initialized
    pub submodules: bool,
}

/// Clone `source` into `dest` and check out the commit `trigger` refers to.
///
/// The trigger reference is always fetched so that an unknown reference fails
/// here. When the trigger carries a revision, that exact commit is checked out
/// even if the reference has moved since the push.
pub async fn acquire(
    source: &RepositorySource,
    trigger: &TriggerEvent,
    dest: &Path,
    submodules: bool,
) -> Result<SourceTree> {
    let url = source.clone_url();
    log::info!("cloning {} into {}", url, dest.display());

    let parent = dest.parent().unwrap_or(dest);
    std::fs::create_dir_all(parent).map_err(|e| AcquisitionError::WorkDir {
        path: parent.to_path_buf(),
        reason: e.to_string(),
    })?;

    let clone = run_git(
        ToolCommand::new("git")
            .args(["clone", "--no-checkout", "--quiet"])
            .arg(&url)
            .arg(dest.as_os_str())
            .current_dir(parent),
    )
    .await?;
    if !clone.success {
        return Err(AcquisitionError::CloneFailed {
            url,
            output: clone.diagnostics(),
        }
        .into());
    }

    let fetch = run_git(git_in(dest).args(["fetch", "--quiet", "--force", "origin"]).arg(&trigger.reference)).await?;
    if !fetch.success {
        return Err(AcquisitionError::UnresolvedReference {
            reference: trigger.reference.clone(),
            output: fetch.diagnostics(),
        }
        .into());
    }
    let fetched = resolve_commit(dest, "FETCH_HEAD", &trigger.reference).await?;

    let commit = match trigger.revision {
        Some(ref revision) => {
            let commit = resolve_commit(dest, revision, revision).await?;
            if commit != fetched {
                log::warn!(
                    "{} now points at {}, checking out pushed revision {}",
                    trigger.reference,
                    fetched,
                    commit
                );
            }
            commit
        }
        None => fetched,
    };

    let checkout = run_git(git_in(dest).args(["checkout", "--quiet", "--force", "--detach"]).arg(&commit)).await?;
    if !checkout.success {
        return Err(AcquisitionError::UnresolvedReference {
            reference: commit,
            output: checkout.diagnostics(),
        }
        .into());
    }

    let has_submodules = dest.join(".gitmodules").exists();
    if submodules && has_submodules {
        log::info!("initializing submodules");
        let update = run_git(git_in(dest).args(["submodule", "update", "--init", "--recursive"])).await?;
        if !update.success {
            return Err(AcquisitionError::SubmodulesFailed {
                output: update.diagnostics(),
            }
            .into());
        }
    }

    Ok(SourceTree {
        path: dest.to_path_buf(),
        commit,
        submodules: submodules && has_submodules,
    })
}

async fn resolve_commit(repo: &Path, rev: &str, reference: &str) -> Result<String> {
    let output = run_git(
        git_in(repo)
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{rev}^{{commit}}")),
    )
    .await?;
    if !output.success {
        return Err(AcquisitionError::UnresolvedReference {
            reference: reference.to_string(),
            output: output.diagnostics(),
        }
        .into());
    }
    Ok(output.stdout.trim().to_string())
}

fn git_in(repo: &Path) -> ToolCommand {
    ToolCommand::new("git").current_dir(repo)
}

async fn run_git(command: ToolCommand) -> Result<ToolOutput> {
    command.run().await.map_err(|e| {
        AcquisitionError::Spawn {
            command: command.display(),
            reason: e.to_string(),
        }
        .into()
    })
}
