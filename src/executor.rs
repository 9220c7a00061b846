// src/executor.rs

//! External build script execution
//!
//! Scripts are spawned directly (no shell command string) with the package's
//! staging directory as working directory and the run's environment overlaid
//! on the inherited one. The call blocks until the child exits; there is no
//! timeout.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Runs package build scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildExecutor {
    quiet: bool,
}

impl BuildExecutor {
    /// Create an executor; `quiet` discards the child's stdout and stderr
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Run `script` in `working_dir` and wait for it
    ///
    /// # Arguments
    ///
    /// * `script` - Path of the executable build script
    /// * `working_dir` - The package's staging directory
    /// * `env` - Variables overlaid onto the inherited environment
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if the script exited with status 0
    pub fn run(&self, script: &Path, working_dir: &Path, env: &BTreeMap<String, String>) -> Result<()> {
        info!("Executing build script {} in {}", script.display(), working_dir.display());

        let mut command = Command::new(script);
        command.current_dir(working_dir).envs(env).stdin(Stdio::null());
        if self.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = command.spawn().map_err(|e| Error::ScriptLaunch {
            script: script.display().to_string(),
            source: e,
        })?;
        let status = child.wait().map_err(|e| {
            Error::IoError(format!("Failed to wait for {}: {}", script.display(), e))
        })?;

        if status.success() {
            debug!("Build script {} succeeded", script.display());
            Ok(())
        } else {
            warn!("Build script {} failed: {}", script.display(), status);
            Err(Error::BuildScriptFailure {
                script: script.display().to_string(),
                exit_code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable script; the handle is synced and closed before return
    fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "#!/bin/sh\n{}\n", body).unwrap();
        file.set_permissions(fs::Permissions::from_mode(0o755)).unwrap();
        file.sync_all().unwrap();
        drop(file);
        path
    }

    #[test]
    fn test_success_with_environment_and_working_dir() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let script = write_script(
            temp.path(),
            "env.sh",
            "echo \"$LFS $MAKEFLAGS\" > out.txt",
        );

        let mut env = BTreeMap::new();
        env.insert("LFS".to_string(), "/mnt/lfs".to_string());
        env.insert("MAKEFLAGS".to_string(), "-j4".to_string());

        BuildExecutor::new(true).run(&script, &work, &env).unwrap();

        assert_eq!(fs::read_to_string(work.join("out.txt")).unwrap(), "/mnt/lfs -j4\n");
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "fail.sh", "exit 3");

        let result = BuildExecutor::new(true).run(&script, temp.path(), &BTreeMap::new());
        match result {
            Err(Error::BuildScriptFailure { exit_code, .. }) => assert_eq!(exit_code, Some(3)),
            other => panic!("expected build failure, got {:?}", other),
        }
    }

    #[test]
    fn test_killed_script_has_no_exit_code() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "killed.sh", "kill -9 $$");

        let result = BuildExecutor::new(true).run(&script, temp.path(), &BTreeMap::new());
        assert!(matches!(
            result,
            Err(Error::BuildScriptFailure { exit_code: None, .. })
        ));
    }

    #[test]
    fn test_missing_script_is_launch_error() {
        let temp = TempDir::new().unwrap();
        let result = BuildExecutor::new(false).run(
            &temp.path().join("missing.sh"),
            temp.path(),
            &BTreeMap::new(),
        );
        assert!(matches!(result, Err(Error::ScriptLaunch { .. })));
    }

    #[test]
    fn test_inherits_unlisted_variables() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "home.sh", "test -n \"$PATH\"");

        let mut env = BTreeMap::new();
        env.insert("LFS_TGT".to_string(), "x86_64-lfs-linux-gnu".to_string());
        assert!(BuildExecutor::new(true).run(&script, temp.path(), &env).is_ok());
    }
}
