//! Git working copy the host tree is deployed from.
//!
//! Everything goes through the `git` CLI; the checkout is moved with
//! `reset --hard`, so the working tree must never carry local edits.

use anyhow::{Context, Result, bail};
use declarative::{ContentHash, ObjectHasher, RevisionSource};
use std::path::{Path, PathBuf};

use crate::runner;

pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Open the checkout at `path`, cloning `origin` into it if it is missing.
    ///
    /// An existing checkout must be a clone of `origin` when one is given.
    pub fn open_or_clone(path: &Path, origin: Option<&str>) -> Result<Self> {
        if !path.exists() {
            let Some(origin) = origin else {
                bail!("{} does not exist and no --origin was given", path.display());
            };
            log::info!("cloning {origin} into {}", path.display());
            let target = path.to_string_lossy();
            runner::run_capture("git", &["clone", origin, &*target])
                .with_context(|| format!("Failed to clone {origin}"))?;
            return Ok(Self { path: path.to_path_buf() });
        }

        let repo = Self { path: path.to_path_buf() };
        repo.head()
            .with_context(|| format!("Not a git repo: {}", path.display()))?;

        if let Some(origin) = origin {
            let url = repo.git(&["config", "--get", "remote.origin.url"]).unwrap_or_default();
            if url != origin {
                bail!("Git repo is not a clone of the desired origin ({url} != {origin})");
            }
        }
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let repo = self.path.to_string_lossy();
        let mut full = vec!["-C", &*repo];
        full.extend_from_slice(args);
        runner::run_capture("git", &full)
    }

    /// Commit currently checked out.
    pub fn head(&self) -> Result<String> {
        self.git(&["log", "--pretty=tformat:%H", "-n", "1"])
    }

    /// Refuse to deploy from a tree with local edits or unpushed commits.
    pub fn verify_clean(&self) -> Result<()> {
        let status = self.git(&["status", "--porcelain", "--untracked-files=no"])?;
        if !status.is_empty() {
            let diff = self.git(&["diff", "-u"])?;
            bail!("Repo is dirty!\n{diff}");
        }
        let head = self.head()?;
        if self.git(&["branch", "-r", "--contains", head.as_str()])?.is_empty() {
            bail!("Repo is not pushed: {head} is not on origin");
        }
        Ok(())
    }

    /// Move the working tree to `revision`, discarding anything in the way.
    pub fn switch_to(&self, revision: &str) -> Result<()> {
        log::debug!("switching {} to {revision}", self.path.display());
        self.git(&["reset", "--hard", revision])
            .with_context(|| format!("Failed to switch to {revision}"))?;
        Ok(())
    }

    /// Fetch, then move the working tree to the remote head of `branch`.
    pub fn switch_to_head(&self, branch: &str) -> Result<()> {
        self.git(&["fetch"]).context("git fetch failed")?;
        if branch != "master" {
            self.git(&["checkout", branch])
                .with_context(|| format!("Failed to check out {branch}"))?;
        }
        let tracking = self.tracking_branch()?;
        self.switch_to(&tracking)
    }

    /// Upstream of the checked-out branch, e.g. `origin/master`.
    pub fn tracking_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"])
            .context("Current branch has no upstream")
    }

    /// Newest commit on the upstream branch.
    pub fn latest_version(&self) -> Result<String> {
        let tracking = self.tracking_branch()?;
        self.git(&["log", tracking.as_str(), "--pretty=tformat:%H", "-n", "1"])
    }

    /// Number of upstream commits not yet deployed.
    pub fn undeployed_revisions(&self, deployed: Option<&str>) -> Result<usize> {
        let tracking = self.tracking_branch()?;
        let range = match deployed {
            None => tracking,
            Some(deployed) if deployed == self.latest_version()? => return Ok(0),
            Some(deployed) => format!("{deployed}..{tracking}"),
        };
        let log = self.git(&["log", "--pretty=tformat:%H", range.as_str()])?;
        Ok(log.lines().filter(|line| !line.is_empty()).count())
    }
}

impl RevisionSource for GitRepo {
    fn show(&self, path: &str, revision: &str) -> Result<Option<Vec<u8>>> {
        let repo = self.path.to_string_lossy();
        let object = format!("{revision}:{path}");
        let output = runner::run_output("git", &["-C", &*repo, "show", object.as_str()])?;
        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            log::debug!("{object} not in history: {}", String::from_utf8_lossy(&output.stderr).trim());
            Ok(None)
        }
    }
}

/// Fingerprints matching git's own blob ids, so repository content and
/// deployed files compare equal when they are.
pub struct GitHasher {
    repo: PathBuf,
}

impl GitHasher {
    pub fn new(repo: &Path) -> Self {
        Self {
            repo: repo.to_path_buf(),
        }
    }
}

impl ObjectHasher for GitHasher {
    fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let repo = self.repo.to_string_lossy();
        let file = path.to_string_lossy();
        let id = runner::run_capture("git", &["-C", &*repo, "hash-object", "--", &*file])?;
        Ok(ContentHash::new(id))
    }

    fn hash_bytes(&self, data: &[u8]) -> Result<ContentHash> {
        let repo = self.repo.to_string_lossy();
        let id = runner::run_with_input("git", &["-C", &*repo, "hash-object", "--stdin"], data)?;
        Ok(ContentHash::new(id))
    }
}
