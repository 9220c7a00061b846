// src/catalog/document.rs

//! Structured-document catalog parser
//!
//! Parses a package repository's `packages.json`:
//!
//! ```json
//! {
//!   "packages": [
//!     { "name": "bash", "src_urls": ["https://ftp.gnu.org/gnu/bash/bash-5.2.tar.gz"], "env": "target" },
//!     { "name": "zlib", "src_urls": ["..."], "env": "target", "build_script": "zlib-build.sh" }
//!   ]
//! }
//! ```
//!
//! Build scripts live next to `packages.json` in the repository directory.

use super::{CatalogFlavor, CatalogFormat, PackageDescriptor};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

/// Catalog file name inside a package repository
pub const CATALOG_FILE: &str = "packages.json";

/// Document catalog format resolving scripts against the repository directory
pub struct DocumentFormat {
    repo_dir: PathBuf,
}

impl DocumentFormat {
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    /// Path of the catalog file inside the repository
    pub fn catalog_path(&self) -> PathBuf {
        self.repo_dir.join(CATALOG_FILE)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    name: String,
    src_urls: Vec<String>,
    env: String,
    #[serde(default)]
    build_script: Option<String>,
}

impl CatalogFormat for DocumentFormat {
    fn flavor(&self) -> CatalogFlavor {
        CatalogFlavor::RemoteUrls
    }

    fn parse(&self, content: &str) -> Result<Vec<PackageDescriptor>> {
        let document: CatalogDocument = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Faulty package repository catalog: {}", e)))?;

        debug!("Parsed {} package entries", document.packages.len());

        Ok(document
            .packages
            .into_iter()
            .map(|entry| {
                let script = entry
                    .build_script
                    .unwrap_or_else(|| PackageDescriptor::default_script_name(&entry.name));
                PackageDescriptor {
                    build_script: self.repo_dir.join(script),
                    name: entry.name,
                    sources: entry.src_urls,
                    environment: Some(entry.env),
                }
            })
            .collect())
    }
}
