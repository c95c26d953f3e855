use std::sync::Arc;

use tracing::instrument;

use super::{ResolveError, Resolver};
use crate::cache::key::{CacheKey, RemoteId};
use crate::cache::traits::PersistentStore;
use crate::remote::RemoteStorage;

/// Split a logical path into its segments.
///
/// Segments are separated by `/` and trimmed; empty ones are dropped, so leading, trailing
/// and doubled slashes are harmless.
///
/// ```
/// use docsort::resolve::split_segments;
///
/// assert_eq!(split_segments("/ DOCS //2025/ PDF "), ["DOCS", "2025", "PDF"]);
/// assert!(split_segments(" / ").is_empty());
/// ```
#[must_use]
pub fn split_segments(logical: &str) -> Vec<&str> {
    logical
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

impl<R: RemoteStorage, S: PersistentStore> Resolver<R, S> {
    /// Resolve every segment of `logical` in order, creating missing containers, and return
    /// the id of the last one.
    ///
    /// The first segment lives under the root sentinel. A path with no segments fails with
    /// [`ResolveError::InvalidPath`] without touching the remote.
    #[instrument(name = "Resolver::resolve_path", skip(self))]
    pub async fn resolve_path(&self, logical: &str) -> Result<RemoteId, ResolveError> {
        let segments = split_segments(logical);
        if segments.is_empty() {
            return Err(ResolveError::InvalidPath(logical.to_owned()));
        }

        let mut parent = RemoteId::root();
        for segment in segments {
            let key = CacheKey::new(parent.clone(), segment);
            let remote = Arc::clone(&self.remote);
            let under = parent.clone();
            let name = segment.to_owned();
            parent = self
                .resolve_or_create(key, move || async move {
                    remote.create_container(&under, &name).await
                })
                .await?;
        }
        Ok(parent)
    }
}
