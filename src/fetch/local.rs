// src/fetch/local.rs

//! Local-copy strategy
//!
//! Each source identifier names a directory in the source store that must
//! contain exactly one archive. Zero or several candidates is an error; the
//! fetcher never guesses.

use super::SourceFetcher;
use crate::catalog::PackageDescriptor;
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Copies pre-staged archives out of `<store>/<source>/`
pub struct LocalCopyFetcher {
    store: PathBuf,
}

impl LocalCopyFetcher {
    pub fn new(store: PathBuf) -> Self {
        Self { store }
    }

    /// Find the sole archive inside the directory for `source`
    pub fn locate(&self, source: &str) -> Result<PathBuf> {
        let dir = self.store.join(source);
        let ambiguous = |count: usize| Error::AmbiguousSource {
            source_id: source.to_string(),
            path: dir.display().to_string(),
            count,
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Source directory {} does not exist", dir.display());
                return Err(ambiguous(0));
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read source directory {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::IoError(format!("Failed to read entry in {}: {}", dir.display(), e))
            })?;
            candidates.push(entry.path());
        }

        match candidates.as_slice() {
            [archive] if archive.is_file() => Ok(archive.clone()),
            [_] => Err(ambiguous(0)),
            _ => Err(ambiguous(candidates.len())),
        }
    }
}

impl SourceFetcher for LocalCopyFetcher {
    fn fetch(&self, package: &PackageDescriptor, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut placed = Vec::with_capacity(package.sources.len());

        for source in &package.sources {
            info!("{}: copying source '{}'", package.name, source);
            let archive = self.locate(source)?;

            let Some(file_name) = archive.file_name() else {
                return Err(ambiguous_name(source, &archive));
            };
            let dest = dest_dir.join(file_name);

            fs::copy(&archive, &dest).map_err(|e| {
                Error::IoError(format!(
                    "Failed to copy {} to {}: {}",
                    archive.display(),
                    dest.display(),
                    e
                ))
            })?;
            debug!("Copied {} to {}", archive.display(), dest.display());
            placed.push(dest);
        }

        Ok(placed)
    }
}

fn ambiguous_name(source: &str, archive: &Path) -> Error {
    Error::AmbiguousSource {
        source_id: source.to_string(),
        path: archive.display().to_string(),
        count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(sources: &[&str]) -> PackageDescriptor {
        PackageDescriptor {
            name: "gcc-pass1".to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            build_script: PathBuf::from("gcc-pass1.sh"),
            environment: None,
        }
    }

    fn store_with(temp: &TempDir, layout: &[(&str, Vec<&str>)]) -> LocalCopyFetcher {
        let store = temp.path().join("src");
        for (source, files) in layout {
            let dir = store.join(source);
            fs::create_dir_all(&dir).unwrap();
            for file in files {
                fs::write(dir.join(file), format!("archive {}", file)).unwrap();
            }
        }
        LocalCopyFetcher::new(store)
    }

    #[test]
    fn test_copies_each_single_archive() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(
            &temp,
            &[("gcc", vec!["gcc-14.2.0.tar.xz"]), ("mpfr", vec!["mpfr-4.2.1.tar.xz"])],
        );
        let dest = temp.path().join("builds/gcc-pass1");
        fs::create_dir_all(&dest).unwrap();

        let placed = fetcher.fetch(&package(&["gcc", "mpfr"]), &dest).unwrap();

        assert_eq!(
            placed,
            vec![dest.join("gcc-14.2.0.tar.xz"), dest.join("mpfr-4.2.1.tar.xz")]
        );
        assert_eq!(
            fs::read_to_string(dest.join("mpfr-4.2.1.tar.xz")).unwrap(),
            "archive mpfr-4.2.1.tar.xz"
        );
    }

    #[test]
    fn test_empty_directory_is_ambiguous() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(&temp, &[("gcc", vec![])]);

        match fetcher.locate("gcc") {
            Err(Error::AmbiguousSource { source_id, count, .. }) => {
                assert_eq!(source_id, "gcc");
                assert_eq!(count, 0);
            }
            other => panic!("expected ambiguous source, got {:?}", other),
        }
    }

    #[test]
    fn test_two_archives_are_ambiguous() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(&temp, &[("gcc", vec!["gcc-13.tar.xz", "gcc-14.tar.xz"])]);

        assert!(matches!(
            fetcher.locate("gcc"),
            Err(Error::AmbiguousSource { count: 2, .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_ambiguous() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(&temp, &[]);

        assert!(matches!(
            fetcher.locate("binutils"),
            Err(Error::AmbiguousSource { count: 0, .. })
        ));
    }

    #[test]
    fn test_single_subdirectory_is_not_an_archive() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(&temp, &[("linux", vec![])]);
        fs::create_dir_all(temp.path().join("src/linux/linux-6.10")).unwrap();

        assert!(matches!(
            fetcher.locate("linux"),
            Err(Error::AmbiguousSource { count: 0, .. })
        ));
    }

    #[test]
    fn test_failure_on_later_source_stops_fetch() {
        let temp = TempDir::new().unwrap();
        let fetcher = store_with(&temp, &[("gcc", vec!["gcc-14.2.0.tar.xz"]), ("gmp", vec![])]);
        let dest = temp.path().join("builds/gcc-pass1");
        fs::create_dir_all(&dest).unwrap();

        let result = fetcher.fetch(&package(&["gcc", "gmp", "mpc"]), &dest);
        assert!(matches!(result, Err(Error::AmbiguousSource { .. })));
    }
}
