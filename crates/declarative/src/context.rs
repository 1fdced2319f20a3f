//! Collaborator traits
//!
//! Reconciliation and execution talk to the outside world only through
//! these traits: the live filesystem, the crontab store, repository
//! history (for diffs) and whoever wants to hear about deployed files.
//! Implementations that shell out live in the binary; tests substitute
//! in-memory ones.

use crate::hash::{ContentHash, ObjectHasher, hash_path};
use acl::{Acl, AclBackend, AclSettings};
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Read-only view of deployed files, addressed by host-relative path.
pub trait LiveState {
    /// Whether anything (including a dangling symlink) exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Content fingerprint; `None` for directories and missing paths.
    fn hash(&self, path: &str) -> Result<Option<ContentHash>>;

    /// Current permissions; `None` for missing paths.
    fn acl(&self, path: &str) -> Result<Option<Acl>>;

    /// Raw content, for diffs; `None` when not a readable file.
    fn content(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// [`LiveState`] over a directory tree, normally `/`.
pub struct LocalState<'a> {
    root: PathBuf,
    hasher: &'a dyn ObjectHasher,
    backend: &'a dyn AclBackend,
    settings: AclSettings,
}

impl<'a> LocalState<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        hasher: &'a dyn ObjectHasher,
        backend: &'a dyn AclBackend,
        settings: AclSettings,
    ) -> Self {
        Self {
            root: root.into(),
            hasher,
            backend,
            settings,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl LiveState for LocalState<'_> {
    fn exists(&self, path: &str) -> bool {
        fs::symlink_metadata(self.resolve(path)).is_ok()
    }

    fn hash(&self, path: &str) -> Result<Option<ContentHash>> {
        let full = self.resolve(path);
        if !self.exists(path) {
            return Ok(None);
        }
        hash_path(self.hasher, &full)
    }

    fn acl(&self, path: &str) -> Result<Option<Acl>> {
        let full = self.resolve(path);
        Acl::from_path(&full, self.settings, self.backend)
            .with_context(|| format!("failed to read permissions of {}", full.display()))
    }

    fn content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.resolve(path))
    }
}

/// Read a regular file, treating missing files and directories as absent.
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Per-user crontab store.
pub trait CrontabService {
    /// Installed crontab, or `None` if the user has none.
    fn export(&self, user: &str) -> Result<Option<String>>;

    /// Replace the user's crontab.
    fn install(&self, user: &str, content: &str) -> Result<()>;

    /// Remove the user's crontab.
    fn remove(&self, user: &str) -> Result<()>;
}

/// File content at a past revision, used only to attach diffs.
pub trait RevisionSource {
    /// Content of `path` (relative to the repository) at `revision`, or
    /// `None` if it did not exist there.
    fn show(&self, path: &str, revision: &str) -> Result<Option<Vec<u8>>>;
}

/// Something the deployment did, or found already done, to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Added(String),
    Modified(String),
    Deleted(String),
    AlreadyAdded(String),
    AlreadyDeleted(String),
}

impl Event {
    /// Host-relative path the event is about.
    pub fn path(&self) -> &str {
        match self {
            Self::Added(p) | Self::Modified(p) | Self::Deleted(p) | Self::AlreadyAdded(p) | Self::AlreadyDeleted(p) => p,
        }
    }

    /// Whether this event belongs to the delete phase.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::Deleted(_) | Self::AlreadyDeleted(_))
    }
}

/// Receives file notifications after each phase of a deployment.
pub trait EventSink {
    fn file_added(&mut self, path: &str);
    fn file_modified(&mut self, path: &str);
    fn file_deleted(&mut self, path: &str);
    fn already_added(&mut self, path: &str);
    fn already_deleted(&mut self, path: &str);

    /// Dispatch an [`Event`] to the matching method.
    fn emit(&mut self, event: &Event) {
        match event {
            Event::Added(p) => self.file_added(p),
            Event::Modified(p) => self.file_modified(p),
            Event::Deleted(p) => self.file_deleted(p),
            Event::AlreadyAdded(p) => self.already_added(p),
            Event::AlreadyDeleted(p) => self.already_deleted(p),
        }
    }
}

/// Sink that only logs.
pub struct LogSink;

impl EventSink for LogSink {
    fn file_added(&mut self, path: &str) {
        log::info!("added {path}");
    }

    fn file_modified(&mut self, path: &str) {
        log::info!("modified {path}");
    }

    fn file_deleted(&mut self, path: &str) {
        log::info!("deleted {path}");
    }

    fn already_added(&mut self, path: &str) {
        log::debug!("already present {path}");
    }

    fn already_deleted(&mut self, path: &str) {
        log::debug!("already removed {path}");
    }
}

/// Sink that remembers every event in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<Event>,
}

impl EventSink for CollectingSink {
    fn file_added(&mut self, path: &str) {
        self.events.push(Event::Added(path.to_string()));
    }

    fn file_modified(&mut self, path: &str) {
        self.events.push(Event::Modified(path.to_string()));
    }

    fn file_deleted(&mut self, path: &str) {
        self.events.push(Event::Deleted(path.to_string()));
    }

    fn already_added(&mut self, path: &str) {
        self.events.push(Event::AlreadyAdded(path.to_string()));
    }

    fn already_deleted(&mut self, path: &str) {
        self.events.push(Event::AlreadyDeleted(path.to_string()));
    }
}
