//! Error types for parsing, reconciliation and execution.
//!
//! Holdups and failures found while reconciling are not errors; they are
//! collected in the [`DeploymentPlan`](crate::DeploymentPlan). The types here
//! are for conditions that stop a run outright.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a resource declaration.
///
/// Any of these aborts the whole load; a partial `ResourceSet` is never used.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Line starts with something that is not a directive
    #[error("{}:{line}: unknown directive: {text}", .file.display())]
    UnknownDirective {
        /// File being parsed
        file: PathBuf,
        /// 1-indexed line number
        line: usize,
        /// The offending line
        text: String,
    },

    /// Directive is missing a required argument
    #[error("{}:{line}: {directive} requires {expected}", .file.display())]
    MissingArgument {
        /// File being parsed
        file: PathBuf,
        /// 1-indexed line number
        line: usize,
        /// The directive
        directive: &'static str,
        /// What was expected
        expected: &'static str,
    },

    /// `crontab` names a file that does not exist
    #[error("crontab file for {user} does not exist: {}", .path.display())]
    MissingCrontabSource {
        /// Crontab owner
        user: String,
        /// Missing source file
        path: PathBuf,
    },

    /// Bad `key=value` attribute on `defattr`/`include`
    #[error("{}:{line}: {source}", .file.display())]
    InvalidAttribute {
        /// File being parsed
        file: PathBuf,
        /// 1-indexed line number
        line: usize,
        /// What was wrong with it
        #[source]
        source: acl::Error,
    },

    /// Glob pattern could not be compiled
    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern {
        /// Pattern as written
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// A file imports itself, directly or indirectly
    #[error("import cycle through {}", .0.display())]
    ImportCycle(PathBuf),

    /// Neither the host file nor the default host file exists
    #[error("host file not found: {}", .0.display())]
    HostFileNotFound(PathBuf),

    /// IO error on a specific path
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while applying a plan.
///
/// Actions applied before the error are not rolled back.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Plan has failures, or holdups and no force
    #[error("deployment blocked: {failures} failure(s), {holdups} holdup(s)")]
    Blocked {
        /// Number of failures in the plan
        failures: usize,
        /// Number of holdups in the plan
        holdups: usize,
    },

    /// Filesystem operation failed
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being modified
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Permissions could not be applied
    #[error("failed to apply permissions: {0}")]
    Acl(#[from] acl::Error),

    /// Crontab could not be installed or removed
    #[error("crontab for {user}: {source}")]
    Crontab {
        /// Crontab owner
        user: String,
        /// What went wrong
        #[source]
        source: anyhow::Error,
    },

    /// Package manager refused the transaction
    #[error("package transaction failed:\n{log}")]
    PackageTransaction {
        /// Package manager output
        log: String,
    },

    /// Package manager could not be run
    #[error("package manager error: {0}")]
    Package(#[from] rpmkit::Error),

    /// Deployment record could not be written
    #[error("failed to write deployment record {}: {source}", .path.display())]
    Record {
        /// Record file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource declaration could not be loaded
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Plan could not be applied
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Permission model error
    #[error(transparent)]
    Acl(#[from] acl::Error),

    /// Package manager error
    #[error(transparent)]
    Package(#[from] rpmkit::Error),

    /// A collaborator (live state, hasher, crontab, revision history) failed
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),

    /// IO error on a specific path
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
