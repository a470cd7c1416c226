//! Build artifacts and the ordered set the publish step consumes.

use crate::error::{BuildError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Kind of distributable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Source distribution (`.tar.gz`, `.zip`)
    Sdist,
    /// Binary wheel (`.whl`)
    Wheel,
}

impl ArtifactKind {
    /// Classify a file by name; `None` for files that are not distributions
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".whl") {
            Some(ArtifactKind::Wheel)
        } else if name.ends_with(".tar.gz") || name.ends_with(".zip") {
            Some(ArtifactKind::Sdist)
        } else {
            None
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Sdist => write!(f, "sdist"),
            ArtifactKind::Wheel => write!(f, "wheel"),
        }
    }
}

/// One distributable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    /// Location of the file
    pub path: PathBuf,
    /// File name
    pub file_name: String,
    /// Distribution kind
    pub kind: ArtifactKind,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

impl BuildArtifact {
    /// Describe the file at `path`, or `None` if it is not a distribution
    pub fn from_path(path: &Path) -> Result<Option<Self>> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(kind) = ArtifactKind::from_file_name(file_name) else {
            return Ok(None);
        };

        let (size, sha256) = digest_file(path).map_err(|e| BuildError::Output {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            kind,
            size,
            sha256,
        }))
    }
}

fn digest_file(path: &Path) -> std::io::Result<(u64, String)> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((size, hex::encode(hasher.finalize())))
}

/// Ordered artifacts from one build: sdists first, then wheels, each by file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildArtifactSet {
    artifacts: Vec<BuildArtifact>,
}

impl BuildArtifactSet {
    /// Build a set from artifacts in any order
    pub fn new(mut artifacts: Vec<BuildArtifact>) -> Self {
        artifacts.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.file_name.cmp(&b.file_name)));
        Self { artifacts }
    }

    /// Collect every distribution in `dist_dir`; fails if there are none
    pub fn collect(dist_dir: &Path) -> Result<Self> {
        let escaped = glob::Pattern::escape(&dist_dir.to_string_lossy());
        let pattern = Path::new(&escaped).join("*");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| BuildError::Output {
            path: dist_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BuildError::Output {
                path: e.path().to_path_buf(),
                reason: e.error().to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            match BuildArtifact::from_path(&path)? {
                Some(artifact) => artifacts.push(artifact),
                None => log::debug!("ignoring non-distribution file {}", path.display()),
            }
        }

        if artifacts.is_empty() {
            return Err(BuildError::NoArtifacts {
                dist_dir: dist_dir.to_path_buf(),
            }
            .into());
        }
        Ok(Self::new(artifacts))
    }

    /// Artifacts in upload order
    pub fn artifacts(&self) -> &[BuildArtifact] {
        &self.artifacts
    }

    /// Paths in upload order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.path.as_path())
    }

    /// File names in upload order
    pub fn file_names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.file_name.as_str()).collect()
    }

    /// Number of artifacts
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_distribution_files() {
        assert_eq!(ArtifactKind::from_file_name("dqc-0.1.0.tar.gz"), Some(ArtifactKind::Sdist));
        assert_eq!(
            ArtifactKind::from_file_name("dqc-0.1.0-py3-none-any.whl"),
            Some(ArtifactKind::Wheel)
        );
        assert_eq!(ArtifactKind::from_file_name("dqc-0.1.0.tar.gz.asc"), None);
        assert_eq!(ArtifactKind::from_file_name(".gitignore"), None);
    }

    #[test]
    fn collect_orders_sdists_before_wheels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pkg-1.0-py3-none-any.whl"), b"wheel").unwrap();
        std::fs::write(dir.path().join("pkg-1.0-cp311-cp311-linux_x86_64.whl"), b"wheel2").unwrap();
        std::fs::write(dir.path().join("pkg-1.0.tar.gz"), b"sdist").unwrap();
        std::fs::write(dir.path().join("README.txt"), b"not an artifact").unwrap();

        let set = BuildArtifactSet::collect(dir.path()).unwrap();
        assert_eq!(
            set.file_names(),
            vec![
                "pkg-1.0.tar.gz",
                "pkg-1.0-cp311-cp311-linux_x86_64.whl",
                "pkg-1.0-py3-none-any.whl",
            ]
        );
        assert_eq!(set.artifacts()[0].size, 5);
        assert_eq!(set.artifacts()[0].sha256, hex::encode(Sha256::digest(b"sdist")));
    }

    #[test]
    fn empty_output_is_a_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildArtifactSet::collect(dir.path()).unwrap_err();
        assert_eq!(err.step(), Some("build"));
    }

    #[cfg(unix)]
    #[test]
    fn glob_metacharacters_in_output_path_are_literal() {
        let parent = tempfile::tempdir().unwrap();
        let dist = parent.path().join("run[1]*?").join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("pkg-1.0.tar.gz"), b"sdist").unwrap();

        let set = BuildArtifactSet::collect(&dist).unwrap();
        assert_eq!(set.file_names(), vec!["pkg-1.0.tar.gz"]);
    }
}
