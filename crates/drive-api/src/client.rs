//! Client, builder and the shared request path.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::DriveError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::resources::FilesResource;

#[cfg(feature = "reqwest-client")]
use crate::backends::ReqwestClient;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint configuration shared by every request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the metadata API.
    pub base_url: String,
    /// Base URL of the media upload API.
    pub upload_url: String,
    /// Per-request timeout used by the default backend.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            upload_url: DEFAULT_UPLOAD_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Builder for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    token: String,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Start building a client that authenticates with the OAuth access `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            config: ClientConfig::default(),
        }
    }

    /// Override the metadata API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Override the upload API base URL.
    #[must_use]
    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.config.upload_url = url.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Finish building with a caller-supplied HTTP backend.
    pub fn build_with<C: HttpClient>(self, http: C) -> DriveClient<C> {
        DriveClient {
            inner: Arc::new(ClientInner {
                http,
                token: self.token,
                config: self.config,
            }),
        }
    }

    /// Finish building with the default `reqwest` backend.
    #[cfg(feature = "reqwest-client")]
    pub fn build(self) -> Result<Drive, DriveError> {
        let http = ReqwestClient::new(self.config.timeout)?;
        Ok(self.build_with(http))
    }
}

/// Drive client backed by the default `reqwest` backend.
#[cfg(feature = "reqwest-client")]
pub type Drive = DriveClient<ReqwestClient>;

#[cfg(feature = "reqwest-client")]
impl Drive {
    /// Shorthand for [`ClientBuilder::new`].
    #[must_use]
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }
}

/// Drive API client, generic over the HTTP backend. Cheap to clone.
pub struct DriveClient<C: HttpClient> {
    pub(crate) inner: Arc<ClientInner<C>>,
}

impl<C: HttpClient> Clone for DriveClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: HttpClient> std::fmt::Debug for DriveClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<C: HttpClient> DriveClient<C> {
    /// Operations on files and folders.
    #[must_use]
    pub fn files(&self) -> FilesResource<'_, C> {
        FilesResource::new(self)
    }

    /// The endpoint configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

/// Which API host a request goes to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Endpoint {
    Metadata,
    Upload,
}

pub(crate) struct ClientInner<C: HttpClient> {
    http: C,
    token: String,
    config: ClientConfig,
}

impl<C: HttpClient> ClientInner<C> {
    pub(crate) fn url(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, DriveError> {
        let base = match endpoint {
            Endpoint::Metadata => &self.config.base_url,
            Endpoint::Upload => &self.config.upload_url,
        };
        let mut url = Url::parse(&format!("{}{path}", base.trim_end_matches('/')))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a JSON request to the metadata API and decode a JSON response.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T, DriveError> {
        let url = self.url(Endpoint::Metadata, path, query)?;
        let body = body
            .map(|b| serde_json::to_vec(b).map(Bytes::from))
            .transpose()
            .map_err(DriveError::Encode)?;
        let content_type = body
            .as_ref()
            .map(|_| HeaderValue::from_static("application/json"));
        let raw = self.send_raw(method, url, content_type, body).await?;
        serde_json::from_slice(&raw).map_err(DriveError::Decode)
    }

    /// Send an authenticated request and return the body of a successful response.
    pub(crate) async fn send_raw(
        &self,
        method: Method,
        url: Url,
        content_type: Option<HeaderValue>,
        body: Option<Bytes>,
    ) -> Result<Bytes, DriveError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::try_from(format!("Bearer {}", self.token))
            .map_err(DriveError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, ct);
        }

        let response = self
            .http
            .send(HttpRequest {
                method,
                url: url.into(),
                headers,
                body,
            })
            .await?;

        if response.status.is_success() {
            Ok(response.body)
        } else {
            Err(DriveError::from_response(response.status, &response.body))
        }
    }
}
