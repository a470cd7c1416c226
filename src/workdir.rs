//! Per-run working directory holding the checkout and the virtual environment.

use crate::error::{AcquisitionError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated directory for one pipeline run, removed on drop unless kept
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    // None once the directory has been kept
    guard: Option<TempDir>,
}

impl WorkDir {
    /// Create a fresh `pyrelease-*` directory under `parent` (system temp dir by default)
    pub fn create(parent: Option<&Path>, keep: bool) -> Result<Self> {
        let parent = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        std::fs::create_dir_all(&parent).map_err(|e| AcquisitionError::WorkDir {
            path: parent.clone(),
            reason: e.to_string(),
        })?;

        let dir = tempfile::Builder::new()
            .prefix("pyrelease-")
            .tempdir_in(&parent)
            .map_err(|e| AcquisitionError::WorkDir {
                path: parent.clone(),
                reason: e.to_string(),
            })?;

        if keep {
            let root = dir.keep();
            log::info!("keeping working directory {}", root.display());
            return Ok(Self { root, guard: None });
        }

        log::debug!("created working directory {}", dir.path().display());
        Ok(Self {
            root: dir.path().to_path_buf(),
            guard: Some(dir),
        })
    }

    /// Root of the working directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether the directory outlives the run
    pub fn is_kept(&self) -> bool {
        self.guard.is_none()
    }

    /// Checkout location
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("source")
    }

    /// Virtual environment location
    pub fn venv_dir(&self) -> PathBuf {
        self.root.join("venv")
    }
}
