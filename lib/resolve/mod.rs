//! Logical path → remote id resolution.
//!
//! A [`Resolver`] owns the cache overlay and the table of in-flight creations, and composes the
//! [`RemoteStorage`] primitives into:
//!
//! - [`resolve_or_create`](Resolver::resolve_or_create): one segment under a known parent.
//! - [`resolve_path`](Resolver::resolve_path): a whole slash-separated path.
//! - [`reconcile`](Resolver::reconcile) and [`seed_root`](Resolver::seed_root): cache upkeep at
//!   startup.

mod coalesce;
mod path;
mod reconcile;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::cache::async_backed::InFlight;
use crate::cache::key::{CacheKey, RemoteId};
use crate::cache::overlay::CacheOverlay;
use crate::cache::traits::PersistentStore;
use crate::remote::{RemoteError, RemoteStorage};

pub use path::split_segments;
pub use reconcile::ReconcileReport;

/// Errors surfaced by path resolution.
///
/// `Clone` because one settled creation is delivered to every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The logical path contains no segments.
    #[error("logical path {0:?} has no segments")]
    InvalidPath(String),

    /// Looking for an existing node failed.
    #[error("failed to look up {key}: {source}")]
    RemoteLookupFailed {
        /// The segment being resolved.
        key: CacheKey,
        /// What the remote reported.
        #[source]
        source: RemoteError,
    },

    /// Creating a missing node failed.
    #[error("failed to create {key}: {source}")]
    RemoteCreateFailed {
        /// The segment being created.
        key: CacheKey,
        /// What the remote reported.
        #[source]
        source: RemoteError,
    },

    /// The creation this caller was waiting on panicked before settling.
    #[error("creation of {key} was abandoned")]
    Abandoned {
        /// The segment being created.
        key: CacheKey,
    },
}

/// Outcome of checking a cached id against the remote.
#[derive(Debug)]
enum Liveness {
    Live,
    Stale(&'static str),
}

/// Default number of liveness probes a reconciliation pass keeps in flight.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Resolves logical paths against a remote, creating missing containers at most once each.
pub struct Resolver<R, S> {
    remote: Arc<R>,
    overlay: Arc<CacheOverlay<S>>,
    pending: InFlight<CacheKey, Result<RemoteId, ResolveError>>,
    probe_concurrency: usize,
}

impl<R: RemoteStorage, S: PersistentStore> Resolver<R, S> {
    /// A resolver over `remote`, caching through `overlay`.
    #[must_use]
    pub fn new(remote: Arc<R>, overlay: Arc<CacheOverlay<S>>) -> Self {
        Self {
            remote,
            overlay,
            pending: InFlight::default(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    /// Cap on concurrent liveness probes during [`reconcile`](Self::reconcile). Zero is treated
    /// as one.
    #[must_use]
    pub fn with_probe_concurrency(mut self, probe_concurrency: usize) -> Self {
        self.probe_concurrency = probe_concurrency.max(1);
        self
    }

    /// The cache overlay this resolver reads and writes.
    #[must_use]
    pub fn overlay(&self) -> &Arc<CacheOverlay<S>> {
        &self.overlay
    }

    /// The remote this resolver talks to.
    #[must_use]
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Number of creations currently in flight.
    #[must_use]
    pub fn pending_creations(&self) -> usize {
        self.pending.len()
    }

    async fn probe(&self, id: &RemoteId) -> Liveness {
        match self.remote.get_node(id).await {
            Ok(node) if node.trashed => Liveness::Stale("trashed"),
            Ok(_) => Liveness::Live,
            Err(RemoteError::NotFound { .. }) => Liveness::Stale("missing"),
            Err(e) => {
                warn!(%id, error = %e, "Liveness probe failed, treating the id as stale.");
                Liveness::Stale("probe failed")
            }
        }
    }
}
