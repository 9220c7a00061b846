// src/config.rs

//! Build configuration threaded through the pipeline
//!
//! A `BuildConfig` is created once per run from command-line parameters and
//! never mutated afterwards. Everything that used to be ambient process state
//! (target root, parallelism, PATH additions) lives here and is handed to the
//! build scripts explicitly through `env_map()`.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cross toolchain target triple handed to every build script
pub const DEFAULT_TARGET_TRIPLE: &str = "x86_64-lfs-linux-gnu";

/// Top-level directories created under the target root before any work
pub const DIRECTORY_LAYOUT: &[&str] = &[
    "bin", "etc", "lib", "lib64", "sbin", "usr", "var", "tools", "builds",
];

/// Marker file that must exist in a target root before any run touches it
pub const SIGN_FILE: &str = "lfs_sign.lock";

const BUILDS_DIR: &str = "builds";
const SOURCES_DIR: &str = "src";
const TOOLS_BIN_DIR: &str = "tools/bin";
const CHAIN_LEDGER_FILE: &str = "builds.lock";
const INSTALL_LEDGER_FILE: &str = "installed.lock";
const RUN_LOCK_FILE: &str = ".todd.lock";

/// Immutable per-run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    target_root: PathBuf,
    target_triple: String,
    jobs: usize,
    quiet: bool,
    inherited_path: String,
}

impl BuildConfig {
    /// Create a configuration for the given target root
    ///
    /// The root is made absolute against the current directory and the
    /// caller's PATH is captured once, so later changes to the process
    /// environment do not leak into build scripts.
    pub fn new(target_root: impl AsRef<Path>, jobs: usize) -> Result<Self> {
        if jobs == 0 {
            return Err(Error::IoError("Job count must be at least 1".to_string()));
        }

        let target_root = std::path::absolute(target_root.as_ref()).map_err(|e| {
            Error::IoError(format!(
                "Failed to resolve target root {}: {}",
                target_root.as_ref().display(),
                e
            ))
        })?;

        Ok(Self {
            target_root,
            target_triple: DEFAULT_TARGET_TRIPLE.to_string(),
            jobs,
            quiet: false,
            inherited_path: std::env::var("PATH").unwrap_or_default(),
        })
    }

    /// Discard build script output instead of inheriting it
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Override the cross target triple
    #[must_use]
    pub fn with_target_triple(mut self, triple: &str) -> Self {
        self.target_triple = triple.to_string();
        self
    }

    /// Override the PATH that `tools/bin` is prepended to
    #[must_use]
    pub fn with_inherited_path(mut self, path: &str) -> Self {
        self.inherited_path = path.to_string();
        self
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn target_triple(&self) -> &str {
        &self.target_triple
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Root of the per-package staging directories
    pub fn builds_dir(&self) -> PathBuf {
        self.target_root.join(BUILDS_DIR)
    }

    /// Local source store used by the delimited catalog flavor
    pub fn sources_dir(&self) -> PathBuf {
        self.target_root.join(SOURCES_DIR)
    }

    pub fn tools_bin_dir(&self) -> PathBuf {
        self.target_root.join(TOOLS_BIN_DIR)
    }

    /// Default ledger for the cross toolchain chain
    pub fn chain_ledger_path(&self) -> PathBuf {
        self.builds_dir().join(CHAIN_LEDGER_FILE)
    }

    /// Default ledger for selective installs
    pub fn install_ledger_path(&self) -> PathBuf {
        self.builds_dir().join(INSTALL_LEDGER_FILE)
    }

    pub fn run_lock_path(&self) -> PathBuf {
        self.builds_dir().join(RUN_LOCK_FILE)
    }

    pub fn sign_file_path(&self) -> PathBuf {
        self.target_root.join(SIGN_FILE)
    }

    /// Environment overlaid onto every build script child
    pub fn env_map(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("LFS".to_string(), self.target_root.display().to_string());
        env.insert("LFS_TGT".to_string(), self.target_triple.clone());
        env.insert("MAKEFLAGS".to_string(), format!("-j{}", self.jobs));

        let tools_bin = self.tools_bin_dir().display().to_string();
        let path = if self.inherited_path.is_empty() {
            tools_bin
        } else {
            format!("{}:{}", tools_bin, self.inherited_path)
        };
        env.insert("PATH".to_string(), path);

        env
    }

    /// Create the minimal directory layout under the target root
    ///
    /// Existing directories are left untouched.
    pub fn create_directory_layout(&self) -> Result<()> {
        info!("Creating minimal directory layout in {}", self.target_root.display());

        for folder in DIRECTORY_LAYOUT {
            let dir = self.target_root.join(folder);
            if !dir.is_dir() {
                debug!("Creating {}", dir.display());
                fs::create_dir_all(&dir).map_err(|e| {
                    Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e))
                })?;
            }
        }

        Ok(())
    }

    /// Fail unless the target root carries the sign file
    pub fn verify_signed(&self) -> Result<()> {
        if self.sign_file_path().is_file() {
            Ok(())
        } else {
            Err(Error::UnsignedTarget(self.target_root.display().to_string()))
        }
    }

    /// Create the sign file, marking the target root as safe to build into
    pub fn sign(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.target_root).map_err(|e| {
            Error::IoError(format!(
                "Failed to create target root {}: {}",
                self.target_root.display(),
                e
            ))
        })?;

        let path = self.sign_file_path();
        fs::write(&path, b"")
            .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Signed target root {}", self.target_root.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_map_contents() {
        let config = BuildConfig::new("/mnt/lfs", 8)
            .unwrap()
            .with_inherited_path("/usr/bin:/bin");

        let env = config.env_map();
        assert_eq!(env["LFS"], "/mnt/lfs");
        assert_eq!(env["LFS_TGT"], "x86_64-lfs-linux-gnu");
        assert_eq!(env["MAKEFLAGS"], "-j8");
        assert_eq!(env["PATH"], "/mnt/lfs/tools/bin:/usr/bin:/bin");
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn test_env_map_with_empty_path() {
        let config = BuildConfig::new("/mnt/lfs", 1)
            .unwrap()
            .with_inherited_path("")
            .with_target_triple("aarch64-lfs-linux-gnu");

        let env = config.env_map();
        assert_eq!(env["PATH"], "/mnt/lfs/tools/bin");
        assert_eq!(env["LFS_TGT"], "aarch64-lfs-linux-gnu");
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let config = BuildConfig::new("relative/root", 2).unwrap();
        assert!(config.target_root().is_absolute());
        assert!(config.target_root().ends_with("relative/root"));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(BuildConfig::new("/mnt/lfs", 0).is_err());
    }

    #[test]
    fn test_create_directory_layout_idempotent() {
        let temp = TempDir::new().unwrap();
        let config = BuildConfig::new(temp.path(), 1).unwrap();

        fs::create_dir_all(temp.path().join("usr/share")).unwrap();
        config.create_directory_layout().unwrap();
        config.create_directory_layout().unwrap();

        for folder in DIRECTORY_LAYOUT {
            assert!(temp.path().join(folder).is_dir(), "{} should exist", folder);
        }
        assert!(temp.path().join("usr/share").is_dir());
    }

    #[test]
    fn test_sign_and_verify() {
        let temp = TempDir::new().unwrap();
        let config = BuildConfig::new(temp.path().join("target"), 1).unwrap();

        assert!(matches!(
            config.verify_signed().unwrap_err(),
            Error::UnsignedTarget(_)
        ));

        let path = config.sign().unwrap();
        assert!(path.is_file());
        assert_eq!(path, temp.path().join("target/lfs_sign.lock"));
        assert!(config.verify_signed().is_ok());
    }
}
