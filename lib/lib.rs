//! docsort shared library.
//!
//! Resolves slash-separated logical paths to folder ids on a remote hierarchical store,
//! creating whatever is missing, with a persistent cache in front of the remote and at most one
//! creation per folder in flight.

/// Caching primitives.
pub mod cache;
pub mod io;
/// The remote storage seam.
pub mod remote;
/// Path resolution on top of the cache and the remote.
pub mod resolve;
