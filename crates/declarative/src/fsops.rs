//! Crash-safe file replacement.
//!
//! New content is always written next to the destination first and then
//! renamed over it, so a reader sees either the old file or the new one.
//! On any failure the temporary files are removed and the destination is
//! left as it was.

use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// Suffix of backups kept for replaced and deleted files.
pub const BACKUP_SUFFIX: &str = ".gitman";

/// `path` with `suffix` appended to its file name.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Replace `dest` with a copy of `source`.
///
/// A symlink `source` is recreated as a symlink with the same target. With
/// `backup`, the previous `dest` is kept as `<dest>.gitman`.
pub fn safe_replace(source: &Path, dest: &Path, backup: bool) -> io::Result<()> {
    let meta = fs::symlink_metadata(source)?;
    if meta.file_type().is_symlink() {
        let target = fs::read_link(source)?;
        return safe_replace_with(dest, backup, |tmp| symlink(&target, tmp));
    }
    safe_replace_with(dest, backup, |tmp| fs::copy(source, tmp).map(|_| ()))
}

/// Replace `dest` with whatever `write` puts at the temporary path it is given.
pub fn safe_replace_with<F>(dest: &Path, backup: bool, write: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let tmp = with_suffix(dest, ".tmp");
    remove_if_present(&tmp)?;

    if let Err(e) = write(&tmp) {
        discard(&tmp);
        return Err(e);
    }

    if backup && fs::symlink_metadata(dest).is_ok() {
        let staged = with_suffix(dest, ".gitman.tmp");
        let result = remove_if_present(&staged)
            .and_then(|()| copy_entry(dest, &staged))
            .and_then(|()| fs::rename(&staged, with_suffix(dest, BACKUP_SUFFIX)));
        if let Err(e) = result {
            discard(&staged);
            discard(&tmp);
            return Err(e);
        }
    }

    if let Err(e) = fs::rename(&tmp, dest) {
        discard(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Copy a file or symlink without following the link.
fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        symlink(fs::read_link(from)?, to)
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn discard(path: &Path) {
    if let Err(e) = remove_if_present(path) {
        log::warn!("failed to clean up {}: {e}", path.display());
    }
}
