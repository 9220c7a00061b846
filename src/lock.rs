// src/lock.rs

//! Exclusive run lock for a target root
//!
//! The ledger and the staging root are owned by a single run. The lock is an
//! advisory `flock` on a file under `builds/`, released when the guard drops
//! (or the process dies).

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard holding the run lock
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting; fails if another run holds it
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                Error::IoError(format!("Failed to create lock file {}: {}", path.display(), e))
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(Error::Locked(path.display().to_string()));
        }

        debug!("Acquired run lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released run lock {}", self.path.display());
    }
}
