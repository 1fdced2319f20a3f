//! Error types for permission operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while parsing, reading or applying permissions.
#[derive(Debug, Error)]
pub enum Error {
    /// Attribute key is unknown, malformed, or not allowed in this configuration
    #[error("invalid attribute: {key}")]
    InvalidAttribute {
        /// The offending `key=value` token (or its key)
        key: String,
    },

    /// Mode is not an octal permission value
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// ACL entry text could not be parsed
    #[error("invalid ACL entry: {0}")]
    InvalidEntry(String),

    /// User name does not resolve to a uid
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Group name does not resolve to a gid
    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// Extended ACLs requested while support is disabled
    #[error("extended ACL support is disabled")]
    ExtendedDisabled,

    /// getfacl/setfacl invocation failed
    #[error("{command} failed for {}: {stderr}", .path.display())]
    CommandFailed {
        /// Command that was run
        command: &'static str,
        /// File the command operated on
        path: PathBuf,
        /// Standard error output
        stderr: String,
    },

    /// IO error on a specific path
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being read or modified
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, Error>;
