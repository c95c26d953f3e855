//! File-backed and in-memory [`PersistentStore`] implementations.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::key::{CacheKey, RemoteId};
use super::traits::{PersistentStore, Snapshot};
use crate::io;

/// Errors raised by cache stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file exists but could not be read.
    #[error("cache store {} is unreadable: {source}", path.display())]
    Read {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a JSON object of strings.
    #[error("cache store {} is corrupt: {source}", path.display())]
    Corrupt {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to encode cache snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The snapshot could not be written to disk.
    #[error("failed to write cache store {}: {source}", path.display())]
    WriteFailed {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Stores the cache as one human-readable JSON document:
///
/// ```json
/// {
///   "root:DOCUMENTS": "1Zx...",
///   "1Zx...:2025": "1Qa..."
/// }
/// ```
///
/// Every save rewrites the whole document through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store persisted at `path`. Nothing is touched on disk until the first load or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when the file does not exist yet.
    async fn try_load(&self) -> Result<Option<Snapshot>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let raw: HashMap<String, String> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let mut snapshot = Snapshot::with_capacity(raw.len());
        for (raw_key, id) in raw {
            if id.is_empty() {
                warn!(key = %raw_key, "Skipping cache entry with an empty id.");
                continue;
            }
            match raw_key.parse::<CacheKey>() {
                Ok(key) => {
                    snapshot.insert(key, RemoteId::from(id));
                }
                Err(e) => warn!(error = %e, "Skipping unparseable cache entry."),
            }
        }
        Ok(Some(snapshot))
    }
}

impl PersistentStore for JsonFileStore {
    async fn load(&self) -> Snapshot {
        match self.try_load().await {
            Ok(Some(snapshot)) => {
                debug!(path = %self.path.display(), entries = snapshot.len(), "Loaded cache store.");
                snapshot
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No cache store yet, starting cold.");
                Snapshot::new()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unusable cache store, starting cold.");
                Snapshot::new()
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        // Sorted so the file diffs cleanly between runs.
        let document: BTreeMap<String, &str> = snapshot
            .iter()
            .map(|(key, id)| (key.to_string(), id.as_str()))
            .collect();
        let mut bytes = serde_json::to_vec_pretty(&document).map_err(StoreError::Encode)?;
        bytes.push(b'\n');

        io::write_atomic(&self.path, &bytes)
            .await
            .map_err(|source| StoreError::WriteFailed {
                path: self.path.clone(),
                source,
            })
    }
}

/// Non-durable store. Used when persistence is disabled, and handy in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            saves: AtomicUsize::new(0),
        }
    }

    /// The last saved snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// How many times [`save`](PersistentStore::save) has been called.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl PersistentStore for MemoryStore {
    async fn load(&self) -> Snapshot {
        self.snapshot()
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self
            .snapshot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = snapshot.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_keys_and_empty_ids_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.json");
        std::fs::write(&path, r#"{"root:A": "id-a", "broken": "id-b", "root:C": ""}"#).unwrap();

        let snapshot = JsonFileStore::new(&path).load().await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get(&CacheKey::under_root("A")),
            Some(&RemoteId::from("id-a"))
        );
    }

    #[tokio::test]
    async fn saved_document_is_sorted_and_pretty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path().join("cache.json"));
        let snapshot: Snapshot = [
            (CacheKey::under_root("B"), RemoteId::from("2")),
            (CacheKey::under_root("A"), RemoteId::from("1")),
        ]
        .into_iter()
        .collect();

        store.save(&snapshot).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "{\n  \"root:A\": \"1\",\n  \"root:B\": \"2\"\n}\n");
    }

    #[tokio::test]
    async fn memory_store_counts_saves() {
        let store = MemoryStore::new();
        store.save(&Snapshot::new()).await.unwrap();
        store.save(&Snapshot::new()).await.unwrap();
        assert_eq!(store.saves(), 2);
    }
}
