// src/staging.rs

//! Per-package staging directories under `<target>/builds`

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Owner of the staging root; hands out one scratch directory per package
///
/// The staging root also holds the run's bookkeeping files (ledgers, run
/// lock). Their names are reserved and never handed out as staging
/// directories.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    reserved: HashSet<String>,
}

impl StagingArea {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            reserved: HashSet::new(),
        }
    }

    /// Reserve the name of `file` if it lives directly in the staging root
    #[must_use]
    pub fn reserve(mut self, file: &Path) -> Self {
        if file.parent() == Some(self.root.as_path()) {
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                self.reserved.insert(name.to_string());
            }
        }
        self
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a package's staging directory (may not exist)
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create a fresh, empty staging directory for `name`
    ///
    /// A leftover directory from an earlier failed run is removed first.
    /// Anything else already at that path is left alone and the call fails.
    pub fn create(&self, name: &str) -> Result<PathBuf> {
        let dir = self.checked_path(name)?;

        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => {
                debug!("Removing stale staging directory {}", dir.display());
                fs::remove_dir_all(&dir).map_err(|e| {
                    Error::IoError(format!("Failed to remove {}: {}", dir.display(), e))
                })?;
            }
            Ok(_) => {
                return Err(Error::IoError(format!(
                    "Staging path {} exists and is not a directory",
                    dir.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to inspect {}: {}",
                    dir.display(),
                    e
                )));
            }
        }

        fs::create_dir_all(&dir).map_err(|e| {
            Error::IoError(format!("Failed to create staging directory {}: {}", dir.display(), e))
        })?;

        debug!("Created staging directory {}", dir.display());
        Ok(dir)
    }

    /// Recursively remove the staging directory for `name`
    pub fn destroy(&self, name: &str) -> Result<()> {
        let dir = self.checked_path(name)?;
        match fs::symlink_metadata(&dir) {
            Ok(meta) if !meta.is_dir() => {
                return Err(Error::IoError(format!(
                    "Staging path {} is not a directory",
                    dir.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            _ => {}
        }

        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!("Removed staging directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::IoError(format!(
                "Failed to remove staging directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    /// Package names become path components; refuse anything that escapes
    /// the root or collides with a reserved file
    fn checked_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || self.is_reserved(name)
        {
            return Err(Error::Config(format!(
                "Package name '{}' cannot be used as a staging directory",
                name
            )));
        }
        Ok(self.path(name))
    }
}
