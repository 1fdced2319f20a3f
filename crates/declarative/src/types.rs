//! Plans, actions and options shared by the reconciler and executor

use crate::context::Event;
use crate::diff::DiffMode;
use crate::resource::{CrontabResource, FileResource};
use rpmkit::Transaction;
use std::path::PathBuf;

/// One resolved change for the executor.
#[derive(Debug, Clone)]
pub enum Action {
    /// Remove a deployed file or (empty) directory
    DeleteFile { path: String, is_dir: bool },
    /// Create a file that does not exist locally
    AddFile(FileResource),
    /// Overwrite a file, or fix its permissions
    UpdateFile(FileResource),
    /// Remove a user's crontab
    DeleteCrontab { user: String },
    /// Install a user's crontab
    WriteCrontab(CrontabResource),
    /// Run all package changes at once
    PackageTransaction(Transaction),
}

impl Action {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::DeleteFile { path, .. } => format!("delete {path}"),
            Self::AddFile(file) => format!("add {}", file.path),
            Self::UpdateFile(file) => format!("update {}", file.path),
            Self::DeleteCrontab { user } => format!("remove crontab for {user}"),
            Self::WriteCrontab(crontab) => format!("write crontab for {}", crontab.user),
            Self::PackageTransaction(tx) => format!("package transaction: {}", tx.summary().join(", ")),
        }
    }
}

/// Outcome of reconciling two resource sets against the live system.
///
/// `verbose` narrates everything, including every holdup and failure.
/// Holdups need force to proceed; failures block unconditionally.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    pub verbose: Vec<String>,
    pub holdups: Vec<String>,
    pub failures: Vec<String>,
    /// In execution order
    pub actions: Vec<Action>,
    /// Notifications for the event sink, emitted after execution
    pub events: Vec<Event>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Informational line.
    pub fn note(&mut self, message: impl Into<String>) {
        self.verbose.push(message.into());
    }

    /// Divergence that needs force.
    pub fn holdup(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.verbose.push(format!("HOLDUP: {message}"));
        self.holdups.push(message);
    }

    /// Condition that blocks the deployment.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.verbose.push(format!("FAILURE: {message}"));
        self.failures.push(message);
    }

    /// Whether the plan may not be executed.
    pub fn is_blocked(&self, force: bool) -> bool {
        !self.failures.is_empty() || (!force && !self.holdups.is_empty())
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Options for reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Which findings get diffs attached
    pub diffs: DiffMode,
    /// Reinstall packages whose files fail verification
    pub reinstall_broken: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            diffs: DiffMode::None,
            reinstall_broken: true,
        }
    }
}

/// Options for execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Keep replaced and deleted files as `<name>.gitman`
    pub backup: bool,
    /// Proceed despite holdups
    pub force: bool,
    /// Directory host-relative paths are resolved against
    pub target_root: PathBuf,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            backup: false,
            force: false,
            target_root: PathBuf::from("/"),
        }
    }
}

/// Counts of what an execution changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub deleted: usize,
    pub added: usize,
    pub updated: usize,
    pub crontabs_removed: usize,
    pub crontabs_written: usize,
    pub packages: usize,
    /// Directories left in place because they were not empty
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.deleted + self.added + self.updated + self.crontabs_removed + self.crontabs_written + self.packages
    }
}
