//! In-memory mirror of the persistent store.
//!
//! [`CacheOverlay`] is the single source of truth for "do we already know this id" during a
//! run. Reads never touch the store. Every mutation is applied to the in-memory map first and
//! then the whole map is written through before the call returns.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::key::{CacheKey, RemoteId};
use super::store::StoreError;
use super::traits::{PersistentStore, Snapshot};

/// Concurrent key → id map, written through to a [`PersistentStore`].
pub struct CacheOverlay<S> {
    map: scc::HashMap<CacheKey, RemoteId>,
    store: Arc<S>,
    /// Serializes saves so that the last save to run always snapshots every earlier mutation.
    save_lock: Mutex<()>,
}

impl<S: PersistentStore> CacheOverlay<S> {
    /// Build an overlay seeded with whatever `store` currently holds.
    pub async fn load(store: Arc<S>) -> Self {
        let snapshot = store.load().await;
        let map = scc::HashMap::with_capacity(snapshot.len());
        for (key, id) in snapshot {
            drop(map.insert_sync(key, id));
        }
        debug!(entries = map.len(), "Cache overlay ready.");
        Self {
            map,
            store,
            save_lock: Mutex::new(()),
        }
    }

    /// The cached id for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<RemoteId> {
        self.map.read_sync(key, |_, id| id.clone())
    }

    /// Record `key → id` and write through.
    ///
    /// On a write failure the in-memory mapping is kept; only durability is lost.
    pub async fn put(&self, key: CacheKey, id: RemoteId) -> Result<(), StoreError> {
        trace!(%key, %id, "Caching id.");
        self.map.upsert_sync(key, id);
        self.persist().await
    }

    /// Forget `key` and write through. Returns whether an entry was removed.
    ///
    /// Nothing is written when the key was absent.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        if self.map.remove_sync(key).is_none() {
            return Ok(false);
        }
        trace!(%key, "Evicted cache entry.");
        self.persist().await.map(|()| true)
    }

    /// Remove each `(key, id)` whose current value is still `id`, then write through once.
    ///
    /// Entries that were re-pointed since the caller read them are left alone. Returns the
    /// number of entries removed; nothing is written when that number is zero.
    pub async fn evict_if_unchanged(
        &self,
        stale: &[(CacheKey, RemoteId)],
    ) -> Result<usize, StoreError> {
        let mut removed = 0;
        for (key, id) in stale {
            if self.map.remove_if_sync(key, |current| current == id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Every cached entry, in no particular order.
    pub async fn entries(&self) -> Vec<(CacheKey, RemoteId)> {
        let mut entries = Vec::with_capacity(self.map.len());
        self.map
            .iter_async(|key, id| {
                entries.push((key.clone(), id.clone()));
                true
            })
            .await;
        entries
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the overlay is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().await;
        let snapshot: Snapshot = self.entries().await.into_iter().collect();
        self.store.save(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;

    fn key(name: &str) -> CacheKey {
        CacheKey::under_root(name)
    }

    #[tokio::test]
    async fn put_writes_through() {
        let store = Arc::new(MemoryStore::new());
        let overlay = CacheOverlay::load(Arc::clone(&store)).await;

        overlay.put(key("A"), RemoteId::from("1")).await.unwrap();

        assert_eq!(overlay.get(&key("A")), Some(RemoteId::from("1")));
        assert_eq!(store.snapshot().get(&key("A")), Some(&RemoteId::from("1")));
    }

    #[tokio::test]
    async fn removing_an_absent_key_does_not_save() {
        let store = Arc::new(MemoryStore::new());
        let overlay = CacheOverlay::load(Arc::clone(&store)).await;

        assert!(!overlay.remove(&key("missing")).await.unwrap());
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn evict_if_unchanged_skips_repointed_entries() {
        let store = Arc::new(MemoryStore::with_snapshot(
            [
                (key("A"), RemoteId::from("1")),
                (key("B"), RemoteId::from("2")),
            ]
            .into_iter()
            .collect(),
        ));
        let overlay = CacheOverlay::load(Arc::clone(&store)).await;
        overlay.put(key("B"), RemoteId::from("3")).await.unwrap();
        let saves_before = store.saves();

        let removed = overlay
            .evict_if_unchanged(&[
                (key("A"), RemoteId::from("1")),
                (key("B"), RemoteId::from("2")),
            ])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.saves(), saves_before + 1);
        assert_eq!(overlay.get(&key("A")), None);
        assert_eq!(overlay.get(&key("B")), Some(RemoteId::from("3")));
    }
}
