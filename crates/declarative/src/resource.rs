//! Declared resources
//!
//! A [`ResourceSet`] is the fully resolved desired state of one host at one
//! revision: files keyed by host-relative path, crontabs keyed by user and
//! packages keyed by name. It is built once by the parser and only read
//! afterwards.

use crate::hash::{ContentHash, ObjectHasher};
use acl::Acl;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Packages are declared with the same type the package manager reports.
pub type PackageResource = rpmkit::Package;

/// First line of every generated crontab.
pub const CRONTAB_HEADER: &str = "### THIS FILE WAS AUTOGENERATED BY GITMAN. DO NOT EDIT! ###";

/// A file, directory or symlink to deploy.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// Path relative to the host root, without a leading `/`
    pub path: String,
    /// Absolute path of the source in the checkout
    pub source: PathBuf,
    /// Source path relative to the repository, for history lookups
    pub repo_path: String,
    /// Whether the source is a directory
    pub is_dir: bool,
    /// Content fingerprint, `None` for directories
    pub hash: Option<ContentHash>,
    /// Permissions the deployed entry must have
    pub acl: Acl,
    /// Permissions for parent directories created while deploying
    pub dir_acl: Option<Acl>,
}

impl FileResource {
    /// Where this resource lives under `target_root`.
    pub fn target(&self, target_root: &Path) -> PathBuf {
        target_root.join(&self.path)
    }
}

/// All crontab fragments declared for one user, concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrontabResource {
    /// Crontab owner
    pub user: String,
    /// Fragment files, sorted
    pub sources: Vec<PathBuf>,
    /// Generated crontab
    pub content: String,
    /// Fingerprint of `content`
    pub hash: ContentHash,
}

impl CrontabResource {
    /// Concatenate `sources` in sorted order.
    ///
    /// Each fragment is framed by `#>> name` / `#<<` markers, with `name`
    /// relative to `base`, so an installed crontab can be traced back to
    /// the files it came from.
    pub fn build(
        user: impl Into<String>,
        mut sources: Vec<PathBuf>,
        base: &Path,
        hasher: &dyn ObjectHasher,
    ) -> anyhow::Result<Self> {
        sources.sort();

        let mut content = format!("{CRONTAB_HEADER}\n\n");
        for source in &sources {
            let text = fs::read_to_string(source)
                .with_context(|| format!("failed to read crontab fragment {}", source.display()))?;
            let label = source.strip_prefix(base).unwrap_or(source);

            content.push_str(&format!("#>> {}\n", label.display()));
            content.push_str(&text);
            if !text.is_empty() && !text.ends_with('\n') {
                content.push('\n');
            }
            content.push_str("#<<\n\n");
        }

        let hash = hasher.hash_bytes(content.as_bytes())?;
        Ok(Self {
            user: user.into(),
            sources,
            content,
            hash,
        })
    }
}

/// Desired state of a host at one revision.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    /// Files, directories and symlinks by host-relative path
    pub files: BTreeMap<String, FileResource>,
    /// Crontabs by user
    pub crontabs: BTreeMap<String, CrontabResource>,
    /// Packages by name
    pub packages: BTreeMap<String, PackageResource>,
}

impl ResourceSet {
    /// A set with nothing in it, used when nothing was deployed before.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.crontabs.is_empty() && self.packages.is_empty()
    }
}

/// Keys in `old` only, in `new` only, and in both, each sorted.
pub(crate) fn partition<'a, V, W>(
    old: &'a BTreeMap<String, V>,
    new: &'a BTreeMap<String, W>,
) -> (Vec<&'a str>, Vec<&'a str>, Vec<&'a str>) {
    let deleted = old.keys().filter(|k| !new.contains_key(*k)).map(String::as_str).collect();
    let added = new.keys().filter(|k| !old.contains_key(*k)).map(String::as_str).collect();
    let common = new.keys().filter(|k| old.contains_key(*k)).map(String::as_str).collect();
    (deleted, added, common)
}
