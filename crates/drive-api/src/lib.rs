//! Rust SDK for the subset of the Google Drive v3 API that docsort needs.

mod backends;
mod client;
pub mod error;
mod http_client;
pub mod models;
mod pagination;
pub mod query;
mod resources;

pub use client::{ClientBuilder, ClientConfig, DriveClient};
#[cfg(feature = "reqwest-client")]
pub use client::Drive;
pub use error::{DriveError, HttpClientError};
pub use http_client::{HttpClient, HttpRequest, HttpResponse};
pub use pagination::PageStream;
pub use query::Query;
pub use resources::{FilesResource, ListParams, Upload};

#[cfg(feature = "reqwest-client")]
pub use backends::ReqwestClient;
