//! Per-key deduplication of in-flight async work.
//!
//! Given a key and an async factory, [`InFlight::join_or_start`] ensures at most one factory runs
//! per key at a time. Later callers for the same key await the running computation through a
//! [`Shared`] future and receive a clone of its output.
//!
//! Unlike a memoizing cache, a slot only lives while its factory runs. The shared future
//! deregisters its own slot as the last step before yielding the output, so by the time any
//! waiter resumes, a new caller for the same key starts from a clean slate. Results that should
//! outlive the computation are expected to be recorded elsewhere by the factory itself.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{future::Future, hash::Hash, pin::Pin};

use futures::FutureExt as _;
use futures::future::Shared;

type SharedFut<V> = Shared<Pin<Box<dyn Future<Output = Option<V>> + Send>>>;

/// A running computation. `generation` tells apart two computations that ran for the same key
/// one after another, so a finished one never deregisters its successor.
struct Slot<V: Clone + Send + 'static> {
    generation: u64,
    fut: SharedFut<V>,
}

/// Map of computations currently running, keyed by what they compute.
///
/// Output `None` means the factory panicked (caught by `catch_unwind`); every caller joined to
/// that computation observes it.
pub struct InFlight<K, V: Clone + Send + 'static> {
    map: Arc<scc::HashMap<K, Slot<V>>>,
    next_generation: AtomicU64,
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self {
            map: Arc::new(scc::HashMap::default()),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Join the computation running for `key`, or start one with `factory`.
    ///
    /// When no computation is running, `settled` is consulted first while the key's slot is
    /// held. If it yields a value, that value is returned and nothing is started. This closes
    /// the window between a caller's earlier lookup and a computation that finished just
    /// before the caller got here.
    ///
    /// Returns `None` if the computation this caller joined or started panicked.
    pub async fn join_or_start<S, F, Fut>(&self, key: K, settled: S, factory: F) -> Option<V>
    where
        S: FnOnce() -> Option<V>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let shared = match self.map.entry_async(key.clone()).await {
            scc::hash_map::Entry::Occupied(occ) => occ.get().fut.clone(),
            scc::hash_map::Entry::Vacant(vac) => {
                if let Some(v) = settled() {
                    return Some(v);
                }
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let fut = self.make_shared(key, generation, factory);
                vac.insert_entry(Slot {
                    generation,
                    fut: fut.clone(),
                });
                fut
            }
        };

        shared.await
    }

    /// Whether a computation is currently running for `key`.
    pub async fn contains(&self, key: &K) -> bool {
        self.map.contains_async(key).await
    }

    /// Number of computations currently running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Wrap a factory future in `catch_unwind` and slot removal, producing a `Shared` with
    /// `Output = Option<V>`.
    fn make_shared<F, Fut>(&self, key: K, generation: u64, factory: F) -> SharedFut<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let map = Arc::clone(&self.map);
        let fut = AssertUnwindSafe(factory()).catch_unwind();
        let boxed: Pin<Box<dyn Future<Output = Option<V>> + Send>> = Box::pin(async move {
            let out = fut.await.ok();
            drop(map.remove_if_sync(&key, |slot| slot.generation == generation));
            out
        });
        boxed.shared()
    }
}
