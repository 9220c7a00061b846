// src/orchestrator.rs

//! Sequential, resumable build pipeline
//!
//! For each requested package, in order:
//! 1. skip it if the ledger already has it
//! 2. create a fresh staging directory
//! 3. fetch its sources into the staging directory
//! 4. run its build script there
//! 5. remove the staging directory and append the name to the ledger
//!
//! Any failure aborts the whole run immediately. The failed package's staging
//! directory is left on disk for inspection and the ledger keeps exactly the
//! packages finished before it.
//!
//! Two modes share the pipeline:
//! - Fixed chain: the whole catalog, in catalog order (cross toolchain)
//! - Selective install: an explicit list of names, all validated against the
//!   catalog and an environment tag before anything is touched

use crate::catalog::{Catalog, DelimitedFormat, DocumentFormat, PackageDescriptor};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::executor::BuildExecutor;
use crate::fetch::{self, SourceFetcher};
use crate::ledger::ProgressLedger;
use crate::lock::RunLock;
use crate::staging::StagingArea;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Aborted,
}

/// Lifecycle of one package within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Pending,
    Staged,
    Sourced,
    Built,
    Recorded,
    Failed,
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packages built in this run, in order
    pub built: Vec<String>,
    /// Packages skipped because the ledger already had them
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

/// Drives packages through the pipeline one at a time
pub struct Orchestrator<'a> {
    config: &'a BuildConfig,
    ledger: ProgressLedger,
    staging: StagingArea,
    fetcher: &'a dyn SourceFetcher,
    executor: BuildExecutor,
    state: RunState,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator over an already loaded ledger
    ///
    /// Ledger and run lock files living in the staging root are reserved, so
    /// no package name can turn them into a staging directory.
    pub fn new(config: &'a BuildConfig, ledger: ProgressLedger, fetcher: &'a dyn SourceFetcher) -> Self {
        let staging = StagingArea::new(config.builds_dir())
            .reserve(&config.chain_ledger_path())
            .reserve(&config.install_ledger_path())
            .reserve(&config.run_lock_path())
            .reserve(ledger.path());

        Self {
            staging,
            executor: BuildExecutor::new(config.quiet()),
            config,
            ledger,
            fetcher,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Fixed-chain mode: every catalog package in catalog order
    pub fn run_chain(&mut self, catalog: &Catalog) -> Result<RunSummary> {
        let packages: Vec<&PackageDescriptor> = catalog.packages().iter().collect();
        self.run_packages(&packages)
    }

    /// Selective-install mode: `names` in the given order
    ///
    /// Every name must exist in the catalog and be tagged `environment`.
    /// Validation covers the whole request before the first package is
    /// touched, so a bad name anywhere leaves ledger and staging untouched.
    pub fn run_selected(
        &mut self,
        catalog: &Catalog,
        names: &[String],
        environment: &str,
    ) -> Result<RunSummary> {
        let packages = match validate_request(catalog, names, environment) {
            Ok(packages) => packages,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(e);
            }
        };

        info!(
            "Attempting installation of the following packages: {}",
            names.join(", ")
        );
        self.run_packages(&packages)
    }

    fn run_packages(&mut self, packages: &[&PackageDescriptor]) -> Result<RunSummary> {
        self.state = RunState::Running;
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for package in packages {
            if self.ledger.contains(&package.name) {
                info!("{}: already built", package.name);
                summary.skipped.push(package.name.clone());
                continue;
            }

            if let Err(e) = self.build_package(package) {
                self.state = RunState::Aborted;
                warn!(
                    "{}: {:?}, aborting run; staging directory kept at {}",
                    package.name,
                    PackageState::Failed,
                    self.staging.path(&package.name).display()
                );
                summary.elapsed = start.elapsed();
                return Err(Error::PackageFailed {
                    package: package.name.clone(),
                    progress: summary,
                    source: Box::new(e),
                });
            }
            summary.built.push(package.name.clone());
        }

        self.state = RunState::Completed;
        summary.elapsed = start.elapsed();
        info!(
            "Run completed: {} built, {} already done",
            summary.built.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    fn build_package(&mut self, package: &PackageDescriptor) -> Result<()> {
        info!("Building {}", package.name);
        debug!("{}: {:?}", package.name, PackageState::Pending);

        let work_dir = self.staging.create(&package.name)?;
        debug!("{}: {:?}", package.name, PackageState::Staged);

        self.fetcher.fetch(package, &work_dir)?;
        debug!("{}: {:?}", package.name, PackageState::Sourced);

        self.executor
            .run(&package.build_script, &work_dir, &self.config.env_map())?;
        debug!("{}: {:?}", package.name, PackageState::Built);

        self.staging.destroy(&package.name)?;
        self.ledger.record(&package.name)?;
        debug!("{}: {:?}", package.name, PackageState::Recorded);

        info!("{}: ok", package.name);
        Ok(())
    }
}

/// Resolve requested names against the catalog, all or nothing
pub fn validate_request<'c>(
    catalog: &'c Catalog,
    names: &[String],
    environment: &str,
) -> Result<Vec<&'c PackageDescriptor>> {
    names
        .iter()
        .map(|name| {
            let package = catalog
                .get(name)
                .ok_or_else(|| Error::UnknownPackage(name.clone()))?;

            match package.environment.as_deref() {
                Some(tag) if tag == environment => Ok(package),
                other => Err(Error::EnvironmentMismatch {
                    package: name.clone(),
                    expected: environment.to_string(),
                    found: other.unwrap_or("none").to_string(),
                }),
            }
        })
        .collect()
}

/// Inputs for a fixed-chain run
#[derive(Debug, Clone)]
pub struct ChainRequest {
    /// Delimited catalog file (`builds.csv`)
    pub catalog: PathBuf,
    /// Directory holding the build scripts named by the catalog
    pub scripts_dir: PathBuf,
    /// Ledger file; defaults to `<target>/builds/builds.lock`
    pub ledger: Option<PathBuf>,
}

/// Inputs for a selective-install run
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Package repository holding `packages.json` and the build scripts
    pub repo_dir: PathBuf,
    pub packages: Vec<String>,
    pub environment: String,
    /// Ledger file; defaults to `<target>/builds/installed.lock`
    pub ledger: Option<PathBuf>,
}

/// Bootstrap the cross toolchain: build the whole chain catalog in order
pub fn run_chain(config: &BuildConfig, request: &ChainRequest) -> Result<RunSummary> {
    config.verify_signed()?;

    let format = DelimitedFormat::new(request.scripts_dir.clone());
    let catalog = Catalog::load(&request.catalog, &format)?;

    let _lock = RunLock::acquire(&config.run_lock_path())?;
    let ledger_path = request.ledger.clone().unwrap_or_else(|| config.chain_ledger_path());
    let ledger = ProgressLedger::load(&ledger_path)?;

    config.create_directory_layout()?;

    let fetcher = fetch::for_flavor(catalog.flavor(), config)?;
    let mut orchestrator = Orchestrator::new(config, ledger, fetcher.as_ref());
    orchestrator.run_chain(&catalog)
}

/// Install an explicit list of packages from a package repository
pub fn run_install(config: &BuildConfig, request: &InstallRequest) -> Result<RunSummary> {
    config.verify_signed()?;

    let format = DocumentFormat::new(request.repo_dir.clone());
    let catalog = Catalog::load(&format.catalog_path(), &format)?;
    validate_request(&catalog, &request.packages, &request.environment)?;

    let _lock = RunLock::acquire(&config.run_lock_path())?;
    let ledger_path = request.ledger.clone().unwrap_or_else(|| config.install_ledger_path());
    let ledger = ProgressLedger::load(&ledger_path)?;

    config.create_directory_layout()?;

    let fetcher = fetch::for_flavor(catalog.flavor(), config)?;
    let mut orchestrator = Orchestrator::new(config, ledger, fetcher.as_ref());
    orchestrator.run_selected(&catalog, &request.packages, &request.environment)
}
