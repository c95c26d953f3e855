use futures::{StreamExt as _, future, stream};
use tracing::{debug, info, instrument, warn};

use super::{Liveness, ResolveError, Resolver};
use crate::cache::key::{CacheKey, RemoteId};
use crate::cache::traits::PersistentStore;
use crate::remote::RemoteStorage;

/// Summary of one [`reconcile`](Resolver::reconcile) pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries probed.
    pub checked: usize,
    /// Entries removed from the cache.
    pub evicted: usize,
    /// Whether the store reflects the result. `false` only when the write-through failed.
    pub persisted: bool,
}

impl<R: RemoteStorage, S: PersistentStore> Resolver<R, S> {
    /// Probe every cached id and drop those that are trashed, gone, or could not be checked.
    ///
    /// The store is written once for the whole batch. An entry that was re-pointed while the
    /// pass was running keeps its new id.
    #[instrument(name = "Resolver::reconcile", skip(self))]
    pub async fn reconcile(&self) -> ReconcileReport {
        let entries = self.overlay.entries().await;
        let checked = entries.len();

        let stale: Vec<(CacheKey, RemoteId)> = stream::iter(entries)
            .map(|(key, id)| async move {
                match self.probe(&id).await {
                    Liveness::Live => None,
                    Liveness::Stale(reason) => {
                        debug!(%key, %id, reason, "Dropping stale cache entry.");
                        Some((key, id))
                    }
                }
            })
            .buffer_unordered(self.probe_concurrency)
            .filter_map(future::ready)
            .collect()
            .await;

        if stale.is_empty() {
            info!(checked, "Cache is consistent with the remote.");
            return ReconcileReport {
                checked,
                evicted: 0,
                persisted: true,
            };
        }

        let report = match self.overlay.evict_if_unchanged(&stale).await {
            Ok(evicted) => ReconcileReport {
                checked,
                evicted,
                persisted: true,
            },
            Err(e) => {
                warn!(error = %e, "Failed to persist reconciled cache.");
                let evicted = stale
                    .iter()
                    .filter(|(key, id)| self.overlay.get(key).as_ref() != Some(id))
                    .count();
                ReconcileReport {
                    checked,
                    evicted,
                    persisted: false,
                }
            }
        };
        info!(checked, evicted = report.evicted, "Reconciled cache.");
        report
    }

    /// Make sure the top-level container `name` is cached.
    ///
    /// Surrounding whitespace is ignored, as in path segments. When it isn't cached, every
    /// non-trashed container with that name is listed and the first one is cached under the
    /// root sentinel. Returns `None` when none exists; the container will then be created on
    /// first use.
    #[instrument(name = "Resolver::seed_root", skip(self))]
    pub async fn seed_root(&self, name: &str) -> Result<Option<RemoteId>, ResolveError> {
        // Same normalisation as a path segment, so the seed is found by `resolve_path`.
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::InvalidPath(name.to_owned()));
        }
        let name = trimmed;
        let key = CacheKey::under_root(name);
        if let Some(id) = self.overlay.get(&key) {
            debug!(%id, "Root container already cached.");
            return Ok(Some(id));
        }

        let candidates = self
            .remote
            .list_all_containers_named(name)
            .await
            .map_err(|source| ResolveError::RemoteLookupFailed {
                key: key.clone(),
                source,
            })?;

        let Some(first) = candidates.first() else {
            info!("No root container yet, it will be created on first use.");
            return Ok(None);
        };
        if candidates.len() > 1 {
            warn!(
                count = candidates.len(),
                chosen = %first.id,
                "Several containers share the root name, using the first."
            );
        }

        if let Err(e) = self.overlay.put(key, first.id.clone()).await {
            warn!(error = %e, "Failed to persist seeded root id.");
        }
        info!(id = %first.id, "Seeded root container.");
        Ok(Some(first.id.clone()))
    }
}
