//! On-disk layout of a persisted index directory.
//!
//! ```text
//! <index_dir>/
//!   index.bin            vectors + docstore (see doc_portal_core::index)
//!   ingested_meta.json   { "rows": { "<fingerprint>": true, ... } }
//!   .portal.lock         advisory single-writer lock
//! ```
//!
//! Every file is replaced atomically: the new content is written to a
//! temporary file in the same directory, synced, then renamed over the
//! old one. A crash leaves either the old or the new file, never a torn one.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use doc_portal_core::index::VectorIndex;
use doc_portal_core::{Error, Result};

pub const INDEX_FILE: &str = "index.bin";
pub const LEDGER_FILE: &str = "ingested_meta.json";
pub const LOCK_FILE: &str = ".portal.lock";

pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

pub fn ledger_path(dir: &Path) -> PathBuf {
    dir.join(LEDGER_FILE)
}

/// True when `dir` holds a persisted index payload.
pub fn index_exists(dir: &Path) -> bool {
    index_path(dir).is_file()
}

pub fn load_index(dir: &Path, operation: &'static str) -> Result<VectorIndex> {
    let path = index_path(dir);
    if !path.is_file() {
        return Err(Error::NotFound {
            operation,
            path: dir.to_path_buf(),
        });
    }
    let bytes = fs::read(&path).map_err(|e| Error::io(operation, &path, e))?;
    VectorIndex::from_bytes(&bytes).map_err(|e| Error::Corrupt {
        operation,
        path,
        reason: e.to_string(),
    })
}

pub fn save_index(dir: &Path, index: &VectorIndex, operation: &'static str) -> Result<()> {
    let path = index_path(dir);
    let bytes = index.to_bytes().map_err(|e| Error::Corrupt {
        operation,
        path: path.clone(),
        reason: e.to_string(),
    })?;
    write_atomic(&path, &bytes, operation)
}

/// Replace `path` with `bytes` via write-temp-then-rename.
pub fn write_atomic(path: &Path, bytes: &[u8], operation: &'static str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::io(operation, parent, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io(operation, tmp.path().to_path_buf(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io(operation, path, e.error))?;
    Ok(())
}

/// Exclusive advisory lock on an index directory, released on drop.
#[derive(Debug)]
pub struct DirLock {
    file: File,
}

impl DirLock {
    /// Take the lock without blocking; fails with [`Error::Locked`] if held.
    pub fn acquire(dir: &Path, operation: &'static str) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(operation, &path, e))?;
        file.try_lock_exclusive().map_err(|_| Error::Locked {
            operation,
            path: dir.to_path_buf(),
        })?;
        Ok(Self { file })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
