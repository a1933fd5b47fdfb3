//! Sharded storage for large previews.
//!
//! A preview for hash `f068999999996868` lives at
//! `<root>/f0/68/f068999999996868.jpg`. Two levels of two-character
//! directories keep per-directory file counts small and roughly uniform.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::log_fs_modification;

/// Extension of every stored preview
pub const PREVIEW_EXTENSION: &str = "jpg";

/// Characters per directory level
const SHARD_WIDTH: usize = 2;

/// Directory levels below the root
const SHARD_DEPTH: usize = 2;

fn validate_hash(hash: &str) -> Result<()> {
    let valid = hash.len() >= SHARD_WIDTH * SHARD_DEPTH
        && hash.bytes().all(|b| b.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidHash(hash.to_string()))
    }
}

/// Map a content hash to its preview path under `root`.
///
/// Pure: never touches the filesystem.
pub fn sharded_path(root: &Path, hash: &str) -> Result<PathBuf> {
    validate_hash(hash)?;

    let mut path = root.to_path_buf();
    for level in 0..SHARD_DEPTH {
        let start = level * SHARD_WIDTH;
        path.push(&hash[start..start + SHARD_WIDTH]);
    }
    path.push(format!("{}.{}", hash, PREVIEW_EXTENSION));

    Ok(path)
}

/// Large-preview tree rooted at a configured directory
#[derive(Debug, Clone)]
pub struct PreviewStore {
    root: PathBuf,
}

impl PreviewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the preview for `hash` lives (whether or not it exists yet)
    pub fn path_for(&self, hash: &str) -> Result<PathBuf> {
        sharded_path(&self.root, hash)
    }

    /// Check if a preview has been written for `hash`
    pub fn exists(&self, hash: &str) -> bool {
        self.path_for(hash).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Write the preview, creating shard directories on demand.
    ///
    /// Writing the same bytes twice is harmless, and a directory created
    /// concurrently by another writer counts as success.
    pub fn write(&self, hash: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(hash)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;

        log_fs_modification("write_preview", &path, Some(&format!("{} bytes", bytes.len())));
        Ok(path)
    }

    /// Read the preview bytes for `hash`
    pub fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.path_for(hash)?;
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }
        Ok(fs::read(path)?)
    }

    /// Delete the preview for `hash`; false if there was none.
    ///
    /// Shard directories are left in place.
    pub fn remove(&self, hash: &str) -> Result<bool> {
        let path = self.path_for(hash)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log_fs_modification("remove_preview", &path, None);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
