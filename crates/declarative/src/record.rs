//! Per-branch record of the last deployed revision.

use crate::error::{Error, ExecutionError, Result};
use crate::fsops::safe_replace_with;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Marker file holding the revision last applied from one branch.
///
/// Lives inside the repository's `.git` directory so it is never part of
/// the tracked tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    path: PathBuf,
}

impl DeploymentRecord {
    /// Record for `branch` in the checkout at `repo`.
    ///
    /// `/` in branch names becomes `^` to keep the record a single file.
    pub fn for_branch(repo: &Path, branch: &str) -> Self {
        let name = format!("gitman_deploy.{}", branch.replace('/', "^"));
        Self {
            path: repo.join(".git").join(name),
        }
    }

    /// Record stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last deployed revision, or `None` if this branch was never deployed.
    pub fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let revision = text.trim();
                Ok((!revision.is_empty()).then(|| revision.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrite the record with `revision`.
    pub fn write(&self, revision: &str) -> std::result::Result<(), ExecutionError> {
        safe_replace_with(&self.path, false, |tmp| fs::write(tmp, revision)).map_err(|source| {
            ExecutionError::Record {
                path: self.path.clone(),
                source,
            }
        })?;
        log::debug!("recorded {revision} in {}", self.path.display());
        Ok(())
    }
}
