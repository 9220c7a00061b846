// src/ledger.rs

//! Append-only progress ledger
//!
//! Plain text, one completed package name per line, no header. Names are
//! appended strictly after a package's build succeeded and each append is
//! synced to disk before `record` returns, so a crash can leave the ledger
//! short but never claims a package that did not finish.
//!
//! A crash in the middle of an append can leave an unterminated fragment at
//! the end of the file. The fragment is ignored on load, and the next
//! `record` voids it by appending a NUL byte plus terminator before its own
//! line. Lines containing NUL are never treated as names.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TERMINATOR: char = '\n';
const VOID_MARKER: char = '\0';

/// Completed packages of one target, in completion order
#[derive(Debug)]
pub struct ProgressLedger {
    path: PathBuf,
    entries: Vec<String>,
    index: HashSet<String>,
    /// The file ends in an unterminated fragment that must be voided
    torn_tail: bool,
}

impl ProgressLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
                String::new()
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read ledger {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let torn_tail = !content.is_empty() && !content.ends_with(TERMINATOR);
        let complete = match content.rfind(TERMINATOR) {
            Some(end) => &content[..end],
            None => "",
        };
        if torn_tail {
            warn!(
                "Ledger {} ends in an unterminated entry; ignoring it",
                path.display()
            );
        }

        let mut entries = Vec::new();
        let mut index = HashSet::new();
        for name in complete
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.contains(VOID_MARKER))
        {
            if index.insert(name.to_string()) {
                entries.push(name.to_string());
            }
        }

        debug!("Loaded {} ledger entries from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            index,
            torn_tail,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Recorded names in completion order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `name` and make it durable before returning
    ///
    /// Never rewrites or truncates existing content.
    pub fn record(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(TERMINATOR) || name.contains(VOID_MARKER) {
            return Err(Error::Config(format!(
                "Invalid package name for ledger: {:?}",
                name
            )));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::IoError(format!("Failed to open ledger {}: {}", self.path.display(), e))
            })?;

        let mut line = String::with_capacity(name.len() + 3);
        if self.torn_tail {
            line.push(VOID_MARKER);
            line.push(TERMINATOR);
        }
        line.push_str(name);
        line.push(TERMINATOR);

        Self::append_durable(&mut file, line.as_bytes()).map_err(|e| {
            Error::IoError(format!("Failed to record {} in ledger {}: {}", name, self.path.display(), e))
        })?;

        self.torn_tail = false;
        if self.index.insert(name.to_string()) {
            self.entries.push(name.to_string());
        }
        debug!("Recorded {} in {}", name, self.path.display());
        Ok(())
    }

    fn append_durable(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_data()
    }
}
