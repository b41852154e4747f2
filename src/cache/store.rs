//! Flat string key-value storage backing the response cache and session tokens.
//!
//! Both backends enforce an optional byte quota measured as the sum of key and
//! value lengths, mirroring how browser storage rejects writes once full. A
//! write that would exceed the quota fails with [`StoreError::QuotaExceeded`]
//! and leaves the store unchanged.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("failed to persist store to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode store contents")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Synchronous key-value namespace. Access never suspends.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns `true` if the key was present.
    fn remove(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Check whether replacing `key`'s value keeps total usage within `quota`.
fn check_quota(
    quota: Option<usize>,
    usage: usize,
    previous: usize,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = usage.saturating_sub(previous) + entry_size(key, value);
    if needed > quota {
        return Err(StoreError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

/// Process-local store. Contents are lost on exit.
///
/// Reads go straight to the map. Mutations serialise on the usage counter so
/// the quota check and the write it guards see the same state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    usage: Mutex<usize>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Bytes currently used (keys plus values).
    pub fn usage(&self) -> usize {
        *self.lock_usage()
    }

    fn lock_usage(&self) -> MutexGuard<'_, usize> {
        self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut usage = self.lock_usage();
        let previous = self
            .entries
            .get(key)
            .map(|v| entry_size(key, v.value()))
            .unwrap_or(0);
        check_quota(self.quota, *usage, previous, key, value)?;
        self.entries.insert(key.to_owned(), value.to_owned());
        *usage = usage.saturating_sub(previous) + entry_size(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> bool {
        let mut usage = self.lock_usage();
        match self.entries.remove(key) {
            Some((key, value)) => {
                *usage = usage.saturating_sub(entry_size(&key, &value));
                true
            }
            None => false,
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation through a temp file and an
/// atomic rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file opens empty. An unreadable or corrupt file also opens
    /// empty, with a warning, and is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        debug!(path = %path.display(), entries = entries.len(), "opened file store");
        Self {
            path,
            entries: Mutex::new(entries),
            quota,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> BTreeMap<String, String> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read store, starting empty");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
            BTreeMap::new()
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let usage: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let previous = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        check_quota(self.quota, usage, previous, key, value)?;

        let old = entries.insert(key.to_owned(), value.to_owned());
        if let Err(e) = self.persist(&entries) {
            // Keep memory consistent with what is on disk.
            match old {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Returns `false` without changing anything when the removal cannot be persisted.
    fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(old) = entries.remove(key) else {
            return false;
        };
        if let Err(e) = self.persist(&entries) {
            warn!(key, error = %e, "failed to persist removal, keeping entry");
            entries.insert(key.to_owned(), old);
            return false;
        }
        true
    }

    fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }
}
