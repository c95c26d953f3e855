//! The durability seam behind [`CacheOverlay`](super::overlay::CacheOverlay).

use std::collections::HashMap;
use std::future::Future;

use super::key::{CacheKey, RemoteId};
use super::store::StoreError;

/// Full contents of the cache at one point in time.
pub type Snapshot = HashMap<CacheKey, RemoteId>;

/// Durable mapping from [`CacheKey`] to [`RemoteId`] that survives process restarts.
///
/// Writes are whole-snapshot replacements. Implementations must make a save atomic: a
/// concurrent reader observes either the previous snapshot or the new one, never a mix.
pub trait PersistentStore: Send + Sync + 'static {
    /// Load the last saved snapshot.
    ///
    /// Never fails. A missing, unreadable or corrupt store yields an empty snapshot so the
    /// process can always start cold.
    fn load(&self) -> impl Future<Output = Snapshot> + Send;

    /// Replace the stored snapshot with `snapshot`.
    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<(), StoreError>> + Send;
}
