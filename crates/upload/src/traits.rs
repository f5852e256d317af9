//! Collaborator interfaces for the upload pipeline.
//!
//! The orchestrator only talks to the outside world through these traits:
//! the coaching backend, the object store, the resumable-upload endpoint,
//! the local file and the credential source. `cruxclip-upload-http` provides
//! the HTTP implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BackendError, StoreError, UploadError};
use crate::types::{
    AccessToken, ChunkProgressUpdate, InitializeRequest, InitializeResponse, MarkUploadedRequest,
    MarkUploadedResponse, WriteOptions,
};

/// The coaching backend's upload-session API.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Open an upload session.
    async fn initialize_upload(
        &self,
        request: &InitializeRequest,
        token: &AccessToken,
    ) -> Result<InitializeResponse, BackendError>;

    /// Commit a transferred upload for processing.
    async fn mark_uploaded(
        &self,
        request: &MarkUploadedRequest,
        token: &AccessToken,
    ) -> Result<MarkUploadedResponse, BackendError>;

    /// Record incremental chunk progress. Callers treat this as best effort.
    async fn update_chunk_progress(
        &self,
        update: &ChunkProgressUpdate,
        token: &AccessToken,
    ) -> Result<(), BackendError>;
}

/// Overwrite-capable object-store writes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` to `location`.
    ///
    /// With `options.upsert` set, writing the same bytes to the same location
    /// twice leaves the store in the same state as writing once.
    async fn write(
        &self,
        location: &str,
        data: Bytes,
        options: &WriteOptions,
        token: &AccessToken,
    ) -> Result<(), StoreError>;
}

/// Where a resumable session talks to, as handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumableEndpoint {
    /// Creation URL of the resumable protocol.
    pub url: String,
    /// Headers sent with every protocol request (auth, upsert).
    pub headers: HashMap<String, String>,
}

/// Primitive operations of an offset-negotiating resumable protocol.
#[async_trait]
pub trait ResumableTransport: Send + Sync {
    /// Create an upload of `total_size` bytes and return its URL.
    async fn create(
        &self,
        endpoint: &ResumableEndpoint,
        total_size: u64,
        metadata: &[(String, String)],
    ) -> Result<String, StoreError>;

    /// Ask the server how many bytes of the upload it holds.
    async fn offset(&self, endpoint: &ResumableEndpoint, upload_url: &str)
        -> Result<u64, StoreError>;

    /// Append `data` at `offset`; returns the new server offset.
    async fn patch(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, StoreError>;
}

/// Read-only access to the video being uploaded.
///
/// Platform differences (native file path, in-memory web blob) live behind
/// this trait instead of inside the upload logic.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Reference the source was created from (path, URI or blob name).
    fn reference(&self) -> &str;

    /// Whether the source currently exists.
    async fn exists(&self) -> bool;

    /// Total size in bytes.
    async fn size(&self) -> Result<u64, UploadError>;

    /// Read `length` bytes starting at `offset`.
    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, UploadError>;

    /// Read the whole source.
    async fn read_all(&self) -> Result<Bytes, UploadError> {
        let size: u64 = self.size().await?;
        self.read_range(0, size).await
    }
}

/// Supplies the current user's access credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The current token, or `None` when signed out.
    async fn access_token(&self) -> Option<AccessToken>;
}

/// A credential provider holding a fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<AccessToken>,
}

impl StaticCredentials {
    /// Provider returning `token`.
    pub fn new(token: AccessToken) -> Self {
        Self { token: Some(token) }
    }

    /// Provider for a signed-out user.
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Option<AccessToken> {
        self.token
            .clone()
            .filter(|token: &AccessToken| !token.as_str().trim().is_empty())
    }
}
