// src/catalog/mod.rs

//! Package catalogs
//!
//! A catalog is the declarative, ordered list of packages driving one run.
//! Two on-disk formats describe the same entity:
//! - Delimited records (`builds.csv`): local source directories, used by the
//!   cross toolchain chain
//! - Structured documents (`packages.json`): remote source URLs plus an
//!   environment tag, used by selective installs
//!
//! The order packages appear in the file is the build order. Loading either
//! fully succeeds or fails; no partial catalog is ever returned.

pub mod delimited;
pub mod document;

pub use delimited::DelimitedFormat;
pub use document::DocumentFormat;

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension appended to a package name to form its default build script
pub const SCRIPT_EXTENSION: &str = "sh";

/// Where a catalog's source identifiers point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFlavor {
    /// Source identifiers name directories in the local source store
    LocalSources,
    /// Source identifiers are remote URLs
    RemoteUrls,
}

/// One buildable package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    /// Ordered source identifiers (directory names or URLs)
    pub sources: Vec<String>,
    /// Resolved path of the build script
    pub build_script: PathBuf,
    /// Environment the package belongs to (e.g. "target", "host")
    pub environment: Option<String>,
}

impl PackageDescriptor {
    /// Default build script file name for a package
    pub fn default_script_name(name: &str) -> String {
        format!("{}.{}", name, SCRIPT_EXTENSION)
    }
}

/// A catalog file format
pub trait CatalogFormat {
    /// Flavor of the descriptors this format produces
    fn flavor(&self) -> CatalogFlavor;

    /// Parse catalog content into descriptors, in declaration order
    ///
    /// Implementations report missing fields and malformed syntax; the
    /// uniqueness check is shared and done by `Catalog::from_descriptors`.
    fn parse(&self, content: &str) -> Result<Vec<PackageDescriptor>>;
}

/// Ordered name -> descriptor mapping built once per run
#[derive(Debug, Clone)]
pub struct Catalog {
    flavor: CatalogFlavor,
    packages: Vec<PackageDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load a catalog file using the given format
    pub fn load<F: CatalogFormat>(path: &Path, format: &F) -> Result<Self> {
        info!("Loading package catalog from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;

        let packages = format.parse(&content)?;
        let catalog = Self::from_descriptors(format.flavor(), packages)?;

        info!("Loaded {} packages from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Build a catalog from parsed descriptors, rejecting duplicate names
    pub fn from_descriptors(flavor: CatalogFlavor, packages: Vec<PackageDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(packages.len());

        for (position, package) in packages.iter().enumerate() {
            if package.name.is_empty() {
                return Err(Error::Config(format!(
                    "Package entry {} has an empty name",
                    position + 1
                )));
            }
            if index.insert(package.name.clone(), position).is_some() {
                return Err(Error::Config(format!(
                    "The catalog contains the package '{}' twice",
                    package.name
                )));
            }
            debug!("Catalog entry {}: {}", position + 1, package.name);
        }

        Ok(Self {
            flavor,
            packages,
            index,
        })
    }

    pub fn flavor(&self) -> CatalogFlavor {
        self.flavor
    }

    /// Look up a package by name
    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.index.get(name).map(|&position| &self.packages[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Packages in declaration (= build) order
    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(name: &str) -> PackageDescriptor {
        PackageDescriptor {
            name: name.to_string(),
            sources: vec![format!("{}-src", name)],
            build_script: PathBuf::from(PackageDescriptor::default_script_name(name)),
            environment: None,
        }
    }

    #[test]
    fn test_catalog_preserves_order() {
        let catalog = Catalog::from_descriptors(
            CatalogFlavor::LocalSources,
            vec![descriptor("gcc-pass1"), descriptor("binutils"), descriptor("glibc")],
        )
        .unwrap();

        let names: Vec<_> = catalog.packages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["gcc-pass1", "binutils", "glibc"]);
        assert_eq!(catalog.get("glibc").unwrap().sources, vec!["glibc-src"]);
        assert!(catalog.contains("binutils"));
        assert!(!catalog.contains("bash"));
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let result = Catalog::from_descriptors(
            CatalogFlavor::LocalSources,
            vec![descriptor("m4"), descriptor("ncurses"), descriptor("m4")],
        );

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("'m4' twice")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_rejects_empty_name() {
        let result = Catalog::from_descriptors(CatalogFlavor::RemoteUrls, vec![descriptor("")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let format = DelimitedFormat::new(temp.path().to_path_buf());
        let result = Catalog::load(&temp.path().join("builds.csv"), &format);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_script_name() {
        assert_eq!(PackageDescriptor::default_script_name("bash"), "bash.sh");
    }
}
