//! HTTP client for the coaching backend's upload-session API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use cruxclip_upload::{
    AccessToken, BackendError, ChunkProgressUpdate, InitializeRequest, InitializeResponse,
    MarkUploadedRequest, MarkUploadedResponse, UploadBackend,
};

use crate::error::{check_status, HttpClientError};
use crate::settings::{join, parse_base_url, HttpSettings};

/// Path of the initialize call, relative to the API base URL.
pub const INITIALIZE_PATH: &str = "initialize";
/// Path of the mark-uploaded call.
pub const MARK_UPLOADED_PATH: &str = "mark-uploaded";
/// Path of the chunk progress call.
pub const CHUNK_PROGRESS_PATH: &str = "update-chunk-progress";

/// `UploadBackend` implementation over JSON-over-HTTP with bearer auth.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackendClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - e.g. `https://api.example.com/functions/v1/uploads`
    /// * `settings` - Timeouts and user agent
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, HttpClientError> {
        Self::with_client(settings.build_client()?, base_url)
    }

    /// Create a client sharing an existing reqwest client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, HttpClientError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        token: &AccessToken,
    ) -> Result<T, HttpClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: reqwest::Response = self.send(path, body, token).await?;
        let text: String = response.text().await?;
        serde_json::from_str(&text).map_err(|e: serde_json::Error| HttpClientError::Decode {
            message: format!("{path}: {e}"),
        })
    }

    /// POST `body` as JSON to `path`, ignoring the response body.
    async fn post_empty<B>(
        &self,
        path: &str,
        body: &B,
        token: &AccessToken,
    ) -> Result<(), HttpClientError>
    where
        B: Serialize + ?Sized,
    {
        self.send(path, body, token).await?;
        Ok(())
    }

    async fn send<B>(
        &self,
        path: &str,
        body: &B,
        token: &AccessToken,
    ) -> Result<reqwest::Response, HttpClientError>
    where
        B: Serialize + ?Sized,
    {
        let url: Url = join(&self.base_url, path)?;
        log::debug!("POST {}", url);
        let response: reqwest::Response = self
            .http
            .post(url)
            .bearer_auth(token.as_str())
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl UploadBackend for HttpBackendClient {
    async fn initialize_upload(
        &self,
        request: &InitializeRequest,
        token: &AccessToken,
    ) -> Result<InitializeResponse, BackendError> {
        Ok(self.post_json(INITIALIZE_PATH, request, token).await?)
    }

    async fn mark_uploaded(
        &self,
        request: &MarkUploadedRequest,
        token: &AccessToken,
    ) -> Result<MarkUploadedResponse, BackendError> {
        Ok(self.post_json(MARK_UPLOADED_PATH, request, token).await?)
    }

    async fn update_chunk_progress(
        &self,
        update: &ChunkProgressUpdate,
        token: &AccessToken,
    ) -> Result<(), BackendError> {
        Ok(self.post_empty(CHUNK_PROGRESS_PATH, update, token).await?)
    }
}
