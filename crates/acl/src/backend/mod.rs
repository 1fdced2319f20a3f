//! Backend abstraction for extended ACL storage.
//!
//! Owner, group and mode go through plain syscalls; only the entry list of
//! an extended ACL needs a platform backend.

pub mod getfacl;

use crate::entries::AclEntries;
use crate::error::{Error, Result};
use std::path::Path;

pub use getfacl::GetfaclBackend;

/// Reads and writes extended ACL entry lists.
pub trait AclBackend {
    /// Whether the backend can be used on this system.
    fn is_available(&self) -> bool;

    /// Whether `path` carries entries beyond owner/group/other.
    fn has_extended(&self, path: &Path) -> Result<bool>;

    /// Read the full entry list of `path`.
    fn read(&self, path: &Path) -> Result<AclEntries>;

    /// Replace the entry list of `path`.
    fn write(&self, path: &Path, entries: &AclEntries) -> Result<()>;
}

/// Backend for systems (or runs) without extended ACL support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtended;

impl AclBackend for NoExtended {
    fn is_available(&self) -> bool {
        false
    }

    fn has_extended(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn read(&self, _path: &Path) -> Result<AclEntries> {
        Err(Error::ExtendedDisabled)
    }

    fn write(&self, _path: &Path, _entries: &AclEntries) -> Result<()> {
        Err(Error::ExtendedDisabled)
    }
}

/// The getfacl backend when its tools are installed, [`NoExtended`] otherwise.
pub fn default_backend() -> Box<dyn AclBackend> {
    let backend = GetfaclBackend::new();
    if backend.is_available() {
        Box::new(backend)
    } else {
        log::debug!("getfacl not found, extended ACLs disabled");
        Box::new(NoExtended)
    }
}
