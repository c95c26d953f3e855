use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::{Liveness, ResolveError, Resolver};
use crate::cache::key::{CacheKey, RemoteId};
use crate::cache::overlay::CacheOverlay;
use crate::cache::traits::PersistentStore;
use crate::remote::{RemoteError, RemoteNode, RemoteStorage};

impl<R: RemoteStorage, S: PersistentStore> Resolver<R, S> {
    /// Resolve `key` to a live remote id, calling `create` only if no such node exists.
    ///
    /// A cached id is trusted only after a liveness probe. Concurrent calls for the same key
    /// share a single find-then-create; `create` runs at most once among them, and a failure
    /// reaches all of them. The next call after a failure starts over.
    #[instrument(name = "Resolver::resolve_or_create", skip(self, create), fields(%key))]
    pub async fn resolve_or_create<F, Fut>(
        &self,
        key: CacheKey,
        create: F,
    ) -> Result<RemoteId, ResolveError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RemoteNode, RemoteError>> + Send + 'static,
    {
        if let Some(id) = self.overlay.get(&key) {
            match self.probe(&id).await {
                Liveness::Live => return Ok(id),
                Liveness::Stale(reason) => {
                    debug!(%id, reason, "Cached id is stale, evicting.");
                    if let Err(e) = self
                        .overlay
                        .evict_if_unchanged(&[(key.clone(), id)])
                        .await
                    {
                        warn!(error = %e, "Failed to persist eviction.");
                    }
                }
            }
        }

        let remote = Arc::clone(&self.remote);
        let overlay = Arc::clone(&self.overlay);
        let task_key = key.clone();
        self.pending
            .join_or_start(
                key.clone(),
                || self.overlay.get(&key).map(Ok),
                move || find_or_create(remote, overlay, task_key, create),
            )
            .await
            .unwrap_or_else(|| Err(ResolveError::Abandoned { key }))
    }
}

/// The body of a pending creation. Runs at most once per key at a time.
async fn find_or_create<R, S, F, Fut>(
    remote: Arc<R>,
    overlay: Arc<CacheOverlay<S>>,
    key: CacheKey,
    create: F,
) -> Result<RemoteId, ResolveError>
where
    R: RemoteStorage,
    S: PersistentStore,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<RemoteNode, RemoteError>> + Send + 'static,
{
    let found = remote
        .find_child_by_name(key.parent(), key.name())
        .await
        .map_err(|source| ResolveError::RemoteLookupFailed {
            key: key.clone(),
            source,
        })?;

    let node = if let Some(node) = found {
        debug!(%key, id = %node.id, "Found existing container.");
        node
    } else {
        let node = create()
            .await
            .map_err(|source| ResolveError::RemoteCreateFailed {
                key: key.clone(),
                source,
            })?;
        debug!(%key, id = %node.id, "Created container.");
        node
    };

    if let Err(e) = overlay.put(key.clone(), node.id.clone()).await {
        warn!(%key, error = %e, "Failed to persist resolved id, keeping it in memory only.");
    }
    Ok(node.id)
}
