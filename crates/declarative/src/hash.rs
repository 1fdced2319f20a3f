//! Content fingerprints.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

/// Fingerprint of a file's content.
///
/// Two sentinels exist besides real digests: an empty regular file hashes
/// to `0`, and a symlink "hashes" to its target string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// The sentinel for zero-length files.
    pub fn empty() -> Self {
        Self("0".to_string())
    }

    /// Wrap an already computed fingerprint.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The fingerprint as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes content fingerprints.
///
/// Must use the same scheme as the repository's own object store so that
/// fingerprints of checked-out files can be compared with history.
pub trait ObjectHasher {
    /// Fingerprint of a regular file's content.
    fn hash_file(&self, path: &Path) -> Result<ContentHash>;

    /// Fingerprint of an in-memory buffer.
    fn hash_bytes(&self, data: &[u8]) -> Result<ContentHash>;
}

/// Streaming BLAKE3 fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl ObjectHasher for Blake3Hasher {
    fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);
        let mut hasher = blake3::Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let read = reader
                .read(&mut buffer)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(ContentHash(hasher.finalize().to_hex().to_string()))
    }

    fn hash_bytes(&self, data: &[u8]) -> Result<ContentHash> {
        Ok(ContentHash(blake3::hash(data).to_hex().to_string()))
    }
}

/// Fingerprint of whatever is at `path`, without following symlinks.
///
/// Returns `None` for directories.
pub fn hash_path(hasher: &dyn ObjectHasher, path: &Path) -> Result<Option<ContentHash>> {
    let meta = fs::symlink_metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;

    if meta.file_type().is_symlink() {
        let target = fs::read_link(path).with_context(|| format!("failed to read link {}", path.display()))?;
        return Ok(Some(ContentHash(target.to_string_lossy().into_owned())));
    }
    if meta.is_dir() {
        return Ok(None);
    }
    if meta.len() == 0 {
        return Ok(Some(ContentHash::empty()));
    }
    hasher.hash_file(path).map(Some)
}
