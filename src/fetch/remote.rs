// src/fetch/remote.rs

//! Remote-download strategy
//!
//! Streams each source URL into the staging directory under the URL's final
//! path segment. The body is written to `<name>.part` and renamed once the
//! transfer completes, so an interrupted download never leaves a file that
//! looks complete. There is no retry and no resume: a failure fails the
//! package.

use super::SourceFetcher;
use crate::catalog::PackageDescriptor;
use crate::error::{Error, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for establishing a connection; transfers themselves are unbounded
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const PARTIAL_SUFFIX: &str = "part";

/// Blocking HTTP downloader for package sources
pub struct RemoteDownloadFetcher {
    client: Client,
}

impl RemoteDownloadFetcher {
    /// Create a new download fetcher
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Local file name for a source URL (its final path segment)
    pub fn file_name_for(url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::Download(format!("Invalid source URL {}: {}", url, e)))?;

        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .ok_or_else(|| Error::Download(format!("Source URL {} has no file name", url)))
    }

    /// Stream `url` into `dest_dir`, returning the final file path
    pub fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = Self::file_name_for(url)?;
        let dest_path = dest_dir.join(&file_name);
        let part_path = dest_dir.join(format!("{}.{}", file_name, PARTIAL_SUFFIX));

        info!("Downloading {} to {}", url, dest_path.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Download(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let result = Self::stream_to(&mut response, &part_path).and_then(|bytes| {
            fs::rename(&part_path, &dest_path).map_err(|e| {
                Error::IoError(format!(
                    "Failed to move {} to {}: {}",
                    part_path.display(),
                    dest_path.display(),
                    e
                ))
            })?;
            Ok(bytes)
        });

        match result {
            Ok(bytes) => {
                debug!("Downloaded {} bytes to {}", bytes, dest_path.display());
                Ok(dest_path)
            }
            Err(e) => {
                if part_path.exists() {
                    warn!("Removing partial download {}", part_path.display());
                    let _ = fs::remove_file(&part_path);
                }
                Err(e)
            }
        }
    }

    fn stream_to(response: &mut reqwest::blocking::Response, part_path: &Path) -> Result<u64> {
        let mut file = File::create(part_path).map_err(|e| {
            Error::IoError(format!("Failed to create file {}: {}", part_path.display(), e))
        })?;

        let bytes = io::copy(response, &mut file)
            .map_err(|e| Error::Download(format!("Transfer interrupted: {}", e)))?;

        file.sync_all().map_err(|e| {
            Error::IoError(format!("Failed to sync {}: {}", part_path.display(), e))
        })?;

        Ok(bytes)
    }
}

impl SourceFetcher for RemoteDownloadFetcher {
    fn fetch(&self, package: &PackageDescriptor, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        info!("Downloading {} source(s) for {}", package.sources.len(), package.name);

        package
            .sources
            .iter()
            .map(|url| self.download(url, dest_dir))
            .collect()
    }
}
