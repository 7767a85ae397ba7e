//! Append-only ledgers of produced keys and used blocks, plus the terminal
//! mapping file.
//!
//! A ledger always keeps its entries in memory. When it has a backing file,
//! every record is also appended there, one entry per line, and a reset
//! truncates the file so it only ever reflects the current attempt.

use crate::error::FunctionalError;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// An append-only list of entries, optionally mirrored to a file.
#[derive(Debug, Clone)]
pub struct Ledger<T> {
    path: Option<PathBuf>,
    entries: Vec<T>,
}

/// Keys emitted for realized paths.
pub type KeyLedger = Ledger<u32>;

/// Block labels and pad patterns recorded as used.
pub type UsedLedger = Ledger<String>;

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            path: None,
            entries: Vec::new(),
        }
    }
}

impl<T: Display + Clone> Ledger<T> {
    /// A ledger without a backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A ledger mirrored to `path`.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: Vec::new(),
        }
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Entries recorded since the last reset.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Drops all entries and truncates the backing file.
    pub fn reset(&mut self) -> Result<(), FunctionalError> {
        self.entries.clear();
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ledger_error(path, e))?;
        }
        fs::write(path, "").map_err(|e| ledger_error(path, e))
    }

    /// Appends entries in order.
    pub fn record(&mut self, entries: &[T]) -> Result<(), FunctionalError> {
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(path) = &self.path {
            let mut text = String::new();
            for entry in entries {
                text.push_str(&entry.to_string());
                text.push('\n');
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(text.as_bytes()))
                .map_err(|e| ledger_error(path, e))?;
        }
        self.entries.extend_from_slice(entries);
        Ok(())
    }
}

fn ledger_error(path: &Path, source: std::io::Error) -> FunctionalError {
    tracing::error!(path = %path.display(), error = %source, "ledger write failed");
    FunctionalError::Ledger {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the terminal mapping as a pretty-printed JSON object.
pub fn write_mapping(path: &Path, mapping: &BTreeMap<String, String>) -> Result<(), FunctionalError> {
    let json = serde_json::to_string_pretty(mapping)
        .map_err(|e| ledger_error(path, std::io::Error::other(e)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ledger_error(path, e))?;
    }
    fs::write(path, json + "\n").map_err(|e| ledger_error(path, e))
}
