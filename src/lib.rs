// src/lib.rs

//! Todd Linux build system
//!
//! Builds a Linux system from source by running a declarative list of
//! packages through external build scripts, one at a time, surviving
//! interrupted runs without repeating finished work.
//!
//! # Architecture
//!
//! - Catalog-driven: the order of packages in the catalog is the build order
//! - Ledger: append-only record of finished packages, synced per entry
//! - Staging: one scratch directory per package under `<target>/builds`,
//!   removed on success and kept on failure
//! - Fail-fast: the first failing package aborts the run

pub mod catalog;
pub mod config;
mod error;
pub mod executor;
pub mod fetch;
pub mod ledger;
pub mod lock;
pub mod orchestrator;
pub mod staging;

pub use catalog::{Catalog, CatalogFlavor, PackageDescriptor};
pub use config::BuildConfig;
pub use error::{Error, Result};
pub use ledger::ProgressLedger;
pub use orchestrator::{ChainRequest, InstallRequest, Orchestrator, RunState, RunSummary};
