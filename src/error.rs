// src/error.rs

use crate::orchestrator::RunSummary;
use thiserror::Error;

/// Core error types for Todd
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent package catalog
    #[error("Catalog error: {0}")]
    Config(String),

    /// Requested package is not part of the catalog
    #[error("Package '{0}' couldn't be found")]
    UnknownPackage(String),

    /// Requested package exists but is tagged for another environment
    #[error("Package '{package}' couldn't be found for environment '{expected}' (tagged '{found}')")]
    EnvironmentMismatch {
        package: String,
        expected: String,
        found: String,
    },

    /// A local source directory did not hold exactly one archive
    #[error("Source '{source_id}' at {path}: expected exactly one archive, found {count}")]
    AmbiguousSource {
        source_id: String,
        path: String,
        count: usize,
    },

    /// Remote source could not be fetched
    #[error("Download error: {0}")]
    Download(String),

    /// Build script ran but exited unsuccessfully
    #[error("Build script {script} failed ({})", describe_exit(.exit_code))]
    BuildScriptFailure {
        script: String,
        exit_code: Option<i32>,
    },

    /// Build script could not be started at all
    #[error("Failed to launch build script {script}: {source}")]
    ScriptLaunch {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Another run holds the target root
    #[error("Target root is locked by another run: {0}")]
    Locked(String),

    /// Target root is missing its sign file
    #[error("Target root {0} has no sign file; run `todd sign` on it first")]
    UnsignedTarget(String),

    /// A package in the run failed; the run was aborted
    ///
    /// `progress` holds what the run finished before the failure.
    #[error("Package '{package}' failed")]
    PackageFailed {
        package: String,
        progress: RunSummary,
        #[source]
        source: Box<Error>,
    },

    /// I/O errors with context
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Name of the package this error is attributed to, if any
    pub fn package(&self) -> Option<&str> {
        match self {
            Error::PackageFailed { package, .. } => Some(package),
            Error::UnknownPackage(package) => Some(package),
            Error::EnvironmentMismatch { package, .. } => Some(package),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Result type alias using Todd's Error type
pub type Result<T> = std::result::Result<T, Error>;
