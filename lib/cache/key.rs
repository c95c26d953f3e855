//! Identifiers and cache keys.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier assigned to a node by the remote storage system.
///
/// Cloning is a reference-count bump, so ids can be handed to every waiter of a coalesced
/// creation without copying the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(Arc<str>);

impl RemoteId {
    /// The sentinel standing for the root of the hierarchy.
    pub const ROOT: &'static str = "root";

    /// Wrap a remote identifier.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The root sentinel.
    #[must_use]
    pub fn root() -> Self {
        Self::new(Self::ROOT)
    }

    /// Whether this is the root sentinel.
    #[must_use]
    pub fn is_root(&self) -> bool {
        &*self.0 == Self::ROOT
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A logical position in the hierarchy: a segment name under a resolved parent.
///
/// Keys compare exactly. No case folding or whitespace normalization happens here; callers
/// trim segments before building keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    parent: RemoteId,
    name: Arc<str>,
}

impl CacheKey {
    /// Separator between parent and name in the persisted form.
    const SEPARATOR: char = ':';

    /// Key for `name` under `parent`.
    #[must_use]
    pub fn new(parent: RemoteId, name: impl Into<Arc<str>>) -> Self {
        Self {
            parent,
            name: name.into(),
        }
    }

    /// Key for a top-level `name` under the root sentinel.
    #[must_use]
    pub fn under_root(name: impl Into<Arc<str>>) -> Self {
        Self::new(RemoteId::root(), name)
    }

    /// The parent identifier.
    #[must_use]
    pub fn parent(&self) -> &RemoteId {
        &self.parent
    }

    /// The segment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.parent, Self::SEPARATOR, self.name)
    }
}

/// Error returned when a persisted key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed cache key {0:?}: expected \"<parent>:<name>\"")]
pub struct ParseKeyError(pub String);

impl FromStr for CacheKey {
    type Err = ParseKeyError;

    /// Parses `"<parent>:<name>"`, splitting on the first separator. Remote ids never contain
    /// the separator; names may.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(Self::SEPARATOR) {
            Some((parent, name)) if !parent.is_empty() && !name.is_empty() => {
                Ok(Self::new(RemoteId::from(parent), name))
            }
            _ => Err(ParseKeyError(s.to_owned())),
        }
    }
}
