//! Error types for package operations.

use thiserror::Error;

/// Errors that can occur while talking to the package manager.
///
/// A transaction that runs but fails is not an error; it is reported as
/// [`TransactionOutcome::Failed`](crate::TransactionOutcome::Failed) so the
/// caller can decide whether it blocks.
#[derive(Debug, Error)]
pub enum Error {
    /// rpm/yum not found in PATH
    #[error("package manager not found: {0}")]
    NotAvailable(&'static str),

    /// Command could not be run or exited unexpectedly
    #[error("command failed: {message}")]
    CommandFailed {
        /// What was being run
        message: String,
        /// Standard error output
        stderr: String,
    },

    /// Unknown verify reason code in a policy
    #[error("unknown verify reason code: {0}")]
    UnknownReason(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;
