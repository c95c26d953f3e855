//! Error types returned by the SDK.

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced by an [`HttpClient`](crate::HttpClient) backend.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other backend-specific failure.
    #[error("http client error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Top-level error returned by every SDK call.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The HTTP backend failed before a response was received.
    #[error(transparent)]
    Http(#[from] HttpClientError),

    /// The API answered with a non-success status.
    #[error("drive API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Message extracted from the Google error envelope, or the raw body.
        message: String,
        /// Machine-readable reason of the first error item, if any.
        reason: Option<String>,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The configured base URL, joined with a request path, is not a valid URL.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// The access token contains bytes that are not allowed in a header.
    #[error("access token is not a valid header value")]
    InvalidToken(#[source] http::header::InvalidHeaderValue),
}

impl DriveError {
    /// The HTTP status of an API error, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported that the requested object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Build an [`DriveError::Api`] from a failed response.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => Self::Api {
                status,
                reason: envelope
                    .error
                    .errors
                    .into_iter()
                    .find_map(|item| item.reason),
                message: envelope.error.message,
            },
            Err(_) => Self::Api {
                status,
                message: String::from_utf8_lossy(body).into_owned(),
                reason: None,
            },
        }
    }
}

/// `{"error": {"code": 404, "message": "...", "errors": [...]}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_is_unpacked() {
        let body = br#"{"error":{"code":404,"message":"File not found: abc.","errors":[{"domain":"global","reason":"notFound","message":"File not found: abc."}]}}"#;
        let err = DriveError::from_response(StatusCode::NOT_FOUND, body);
        assert!(err.is_not_found());
        match err {
            DriveError::Api {
                message, reason, ..
            } => {
                assert_eq!(message, "File not found: abc.");
                assert_eq!(reason.as_deref(), Some("notFound"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let err = DriveError::from_response(StatusCode::BAD_GATEWAY, b"upstream hiccup");
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("upstream hiccup"));
    }
}
