//! What the resolver needs from a remote hierarchical store.

use std::future::Future;

use thiserror::Error;

use crate::cache::key::RemoteId;

/// A node in the remote hierarchy, as far as the resolver cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    /// Identifier assigned by the remote.
    pub id: RemoteId,
    /// Display name.
    pub name: String,
    /// First parent, if the remote reports one.
    pub parent: Option<RemoteId>,
    /// Whether the node sits in the trash.
    pub trashed: bool,
}

/// Errors reported by a [`RemoteStorage`].
///
/// `Clone` because a single failure may be delivered to every caller waiting on the same
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No node exists with this id.
    #[error("remote node {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: RemoteId,
    },

    /// The remote rejected the request.
    #[error("remote API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the remote.
        message: String,
    },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("failed to decode remote response: {0}")]
    Decode(String),

    /// A search came back empty without covering every location, so the miss is not
    /// conclusive.
    #[error("search for {name:?} did not cover every location")]
    IncompleteSearch {
        /// The name that was searched for.
        name: String,
    },
}

/// The four primitives path resolution is composed of.
///
/// Implementations must be safe to call concurrently. None of these retries on its own.
pub trait RemoteStorage: Send + Sync + 'static {
    /// The first non-trashed container named `name` directly under `parent`, if any.
    fn find_child_by_name(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> impl Future<Output = Result<Option<RemoteNode>, RemoteError>> + Send;

    /// Create a container named `name` under `parent`.
    fn create_container(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> impl Future<Output = Result<RemoteNode, RemoteError>> + Send;

    /// Fetch the node with this id. Fails with [`RemoteError::NotFound`] when it doesn't exist.
    fn get_node(&self, id: &RemoteId)
    -> impl Future<Output = Result<RemoteNode, RemoteError>> + Send;

    /// Every non-trashed container named `name`, anywhere the caller can see.
    fn list_all_containers_named(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<RemoteNode>, RemoteError>> + Send;
}
