//! Reading and applying permissions on the live filesystem.

use crate::backend::AclBackend;
use crate::error::{Error, Result};
use crate::owner;
use crate::types::{Acl, AclSettings, ExtendedAcl, SimpleAcl};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

impl Acl {
    /// Read the permissions of `path` without following symlinks.
    ///
    /// Returns `None` if nothing exists at `path`. Files with extended
    /// entries come back as [`Acl::Extended`] when `settings.extended` is
    /// set; a backend error downgrades to the simple view rather than
    /// failing the read.
    pub fn from_path(path: &Path, settings: AclSettings, backend: &dyn AclBackend) -> Result<Option<Self>> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        if meta.file_type().is_symlink() {
            return Ok(Some(Self::Symlink));
        }

        let user = Some(owner::user_name(meta.uid()));
        let group = Some(owner::group_name(meta.gid()));
        let mode = meta.permissions().mode() & 0o7777;

        if settings.extended {
            match read_extended(path, backend) {
                Ok(Some(entries)) => return Ok(Some(Self::Extended(ExtendedAcl { user, group, entries }))),
                Ok(None) => {}
                Err(e) => log::debug!("falling back to mode for {}: {e}", path.display()),
            }
        }

        Ok(Some(Self::Simple(SimpleAcl {
            user,
            group,
            mode: Some(mode),
        })))
    }

    /// Make the permissions of `path` satisfy this ACL.
    ///
    /// Only fields that are set and differ from the live value are changed.
    /// Symlinks are left alone.
    pub fn apply_to(&self, path: &Path, backend: &dyn AclBackend) -> Result<()> {
        if matches!(self, Self::Symlink) {
            return Ok(());
        }

        let meta = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        apply_ownership(path, &meta, self.user(), self.group())?;

        match self {
            Self::Simple(SimpleAcl { mode: Some(mode), .. }) => {
                if meta.permissions().mode() & 0o7777 != *mode {
                    log::debug!("chmod {mode:04o} {}", path.display());
                    fs::set_permissions(path, fs::Permissions::from_mode(*mode)).map_err(|e| Error::io(path, e))?;
                }
                Ok(())
            }
            Self::Extended(acl) => backend.write(path, &acl.entries),
            _ => Ok(()),
        }
    }
}

fn read_extended(path: &Path, backend: &dyn AclBackend) -> Result<Option<crate::AclEntries>> {
    if !backend.has_extended(path)? {
        return Ok(None);
    }
    backend.read(path).map(Some)
}

fn apply_ownership(path: &Path, meta: &fs::Metadata, user: Option<&str>, group: Option<&str>) -> Result<()> {
    let uid = match user {
        Some(name) if owner::user_name(meta.uid()) != name => Some(owner::uid_of(name)?),
        _ => None,
    };
    let gid = match group {
        Some(name) if owner::group_name(meta.gid()) != name => Some(owner::gid_of(name)?),
        _ => None,
    };

    if uid.is_none() && gid.is_none() {
        return Ok(());
    }

    log::debug!("chown {uid:?}:{gid:?} {}", path.display());
    std::os::unix::fs::chown(path, uid, gid).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoExtended;
    use crate::entries::AclEntries;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SETTINGS: AclSettings = AclSettings { extended: true };

    #[derive(Default)]
    struct RecordingBackend {
        written: RefCell<Vec<(PathBuf, String)>>,
    }

    impl AclBackend for RecordingBackend {
        fn is_available(&self) -> bool {
            true
        }

        fn has_extended(&self, _path: &Path) -> Result<bool> {
            Ok(true)
        }

        fn read(&self, _path: &Path) -> Result<AclEntries> {
            AclEntries::parse("u::rw-,u:bob:r--,g::r--,o::---", 0)
        }

        fn write(&self, path: &Path, entries: &AclEntries) -> Result<()> {
            self.written.borrow_mut().push((path.to_path_buf(), entries.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_missing_path_has_no_acl() {
        let tmp = TempDir::new().unwrap();
        let acl = Acl::from_path(&tmp.path().join("missing"), SETTINGS, &NoExtended).unwrap();
        assert!(acl.is_none());
    }

    #[test]
    fn test_reads_mode_and_owner() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        let acl = Acl::from_path(&file, SETTINGS, &NoExtended).unwrap().unwrap();
        assert_eq!(acl.mode_str(), "0640");
        assert!(acl.user().is_some());
        assert_eq!(acl, Acl::simple(None, None, Some(0o640)));
    }

    #[test]
    fn test_symlink_reads_as_symlink() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink("dangling", &link).unwrap();

        let acl = Acl::from_path(&link, SETTINGS, &NoExtended).unwrap().unwrap();
        assert!(matches!(acl, Acl::Symlink));
    }

    #[test]
    fn test_extended_read_through_backend() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();

        let backend = RecordingBackend::default();
        let acl = Acl::from_path(&file, SETTINGS, &backend).unwrap().unwrap();
        assert!(acl.is_extended());

        let acl = Acl::from_path(&file, AclSettings { extended: false }, &backend).unwrap().unwrap();
        assert!(!acl.is_extended());
    }

    #[test]
    fn test_apply_changes_mode_only() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        Acl::simple(None, None, Some(0o600)).apply_to(&file, &NoExtended).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_apply_with_current_owner_is_noop() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();

        let live = Acl::from_path(&file, SETTINGS, &NoExtended).unwrap().unwrap();
        let wanted = Acl::simple(live.user(), live.group(), None);
        wanted.apply_to(&file, &NoExtended).unwrap();
    }

    #[test]
    fn test_apply_extended_writes_entries() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();

        let acl = Acl::Extended(ExtendedAcl {
            user: None,
            group: None,
            entries: AclEntries::parse("u::rw-,u:bob:r--,g::r--,o::---", 0).unwrap(),
        });
        let backend = RecordingBackend::default();
        acl.apply_to(&file, &backend).unwrap();

        let written = backend.written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, "u::rw-,u:bob:r--,g::r--,m::r--,o::---");
    }

    #[test]
    fn test_apply_to_symlink_is_noop() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink("dangling", &link).unwrap();
        Acl::Symlink.apply_to(&link, &NoExtended).unwrap();
    }
}
