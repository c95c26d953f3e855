//! Resource namespaces for the Drive API.

mod files;

pub use files::{FilesResource, ListParams, Upload};
