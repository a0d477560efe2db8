/*!
 * Persisted memoization of chunk translations.
 *
 * The store maps exact source chunk text to its translation and is written
 * through to disk after every successful chunk, so an interrupted run can be
 * resumed without repeating finished work. The file is a pretty-printed JSON
 * object, replaced atomically on every flush.
 */

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::errors::StoreError;

/// Source-to-translation map backed by a JSON file
#[derive(Debug)]
pub struct MemoizationStore {
    /// Location of the cache file
    path: PathBuf,

    /// In-memory entries
    entries: Mutex<BTreeMap<String, String>>,

    /// Held across a flush so concurrent chunks never interleave writes
    writer: tokio::sync::Mutex<()>,
}

impl MemoizationStore {
    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        if !entries.is_empty() {
            info!("Resuming with {} cached chunks from {}", entries.len(), path.display());
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Look up a source chunk
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Record a translation and write the whole map to disk.
    ///
    /// An existing key is authoritative and is left untouched. Returns the
    /// value the store holds for `key` after the call, which is what callers
    /// must emit so a rerun reproduces the same output.
    pub async fn put_and_flush(&self, key: &str, value: &str) -> Result<String, StoreError> {
        // One flush at a time, so snapshots reach disk in insertion order
        let _writer = self.writer.lock().await;

        let snapshot = {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(key) {
                debug!("Keeping the first stored translation of a repeated chunk");
                return Ok(existing.clone());
            }
            entries.insert(key.to_string(), value.to_string());
            match serde_json::to_string_pretty(&*entries) {
                Ok(json) => json,
                Err(e) => {
                    entries.remove(key);
                    return Err(e.into());
                }
            }
        };

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_atomic(&path, &snapshot))
            .await
            .unwrap_or_else(|e| {
                Err(StoreError::Write {
                    path: self.path.clone(),
                    source: std::io::Error::other(e),
                })
            });

        if let Err(e) = written {
            // Keep memory consistent with the last good flush
            self.entries.lock().remove(key);
            return Err(e);
        }
        Ok(value.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the cache file after a clean run
    pub fn discard(&self) -> Result<(), StoreError> {
        let _guard = self.entries.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed cache file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

// Stage in the target directory so the final rename stays on one filesystem
fn write_atomic(path: &Path, json: &str) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(write_err)?;

    let mut staging = NamedTempFile::new_in(&dir).map_err(write_err)?;
    staging.write_all(json.as_bytes()).map_err(write_err)?;
    staging.as_file().sync_all().map_err(write_err)?;
    staging.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
