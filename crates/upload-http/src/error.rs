//! Error types for the HTTP clients.

use cruxclip_upload::{BackendError, StoreError};
use serde::Deserialize;
use thiserror::Error;

/// Errors specific to the HTTP clients.
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// A base or endpoint URL could not be parsed or joined.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The reqwest client could not be built.
    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },

    /// The request could not be built (bad header name or value).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The request never produced a response (connect error, timeout, reset).
    #[error("Request failed: {message}")]
    Request { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16, message: Option<String> },

    /// The server answered but the response could not be decoded.
    #[error("Invalid response: {message}")]
    Decode { message: String },
}

impl HttpClientError {
    pub(crate) fn invalid_url(url: &str, err: impl std::fmt::Display) -> Self {
        HttpClientError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            HttpClientError::InvalidRequest {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            HttpClientError::Decode {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            HttpClientError::Status {
                status: status.as_u16(),
                message: None,
            }
        } else {
            HttpClientError::Request {
                message: err.to_string(),
            }
        }
    }
}

impl From<HttpClientError> for BackendError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Status { status, message } => BackendError::Status { status, message },
            HttpClientError::Decode { message } => BackendError::InvalidResponse { message },
            HttpClientError::Request { message } => BackendError::NoResponse { message },
            other @ (HttpClientError::InvalidUrl { .. }
            | HttpClientError::ClientBuild { .. }
            | HttpClientError::InvalidRequest { .. }) => BackendError::Client {
                message: other.to_string(),
            },
        }
    }
}

impl From<HttpClientError> for StoreError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Request { message } => StoreError::Network { message },
            HttpClientError::Status { status, message } => StoreError::Rejected {
                status,
                message: message.unwrap_or_default(),
            },
            other => StoreError::Protocol {
                message: other.to_string(),
            },
        }
    }
}

/// Error payload shapes returned by the backend and the storage API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract a human-readable message from an error response body.
///
/// Prefers the JSON `error` field, then `message`, then the raw text.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed: &str = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed
            .error
            .or(parsed.message)
            .filter(|message: &String| !message.trim().is_empty()),
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Turn a non-success response into `HttpClientError::Status`.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, HttpClientError> {
    let status: reqwest::StatusCode = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response.text().await.unwrap_or_default();
    Err(HttpClientError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}
