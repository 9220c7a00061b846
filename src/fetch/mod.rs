// src/fetch/mod.rs

//! Source acquisition for packages
//!
//! Two interchangeable strategies, picked by catalog flavor:
//! - `LocalCopyFetcher`: copies pre-staged archives from the local source store
//! - `RemoteDownloadFetcher`: streams each source URL over HTTP
//!
//! Any single source failing fails the whole package.

pub mod local;
pub mod remote;

pub use local::LocalCopyFetcher;
pub use remote::RemoteDownloadFetcher;

use crate::catalog::{CatalogFlavor, PackageDescriptor};
use crate::config::BuildConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Places a package's sources into its staging directory
pub trait SourceFetcher {
    /// Fetch every declared source of `package` into `dest_dir`
    ///
    /// Returns the paths of the placed files, in declaration order.
    fn fetch(&self, package: &PackageDescriptor, dest_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Build the fetcher matching a catalog flavor
pub fn for_flavor(flavor: CatalogFlavor, config: &BuildConfig) -> Result<Box<dyn SourceFetcher>> {
    Ok(match flavor {
        CatalogFlavor::LocalSources => Box::new(LocalCopyFetcher::new(config.sources_dir())),
        CatalogFlavor::RemoteUrls => Box::new(RemoteDownloadFetcher::new()?),
    })
}
