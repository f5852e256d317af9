//! Shared data structures for upload operations.

use std::collections::HashMap;
use std::time::Duration;

use cruxclip_common::{
    infer_mime_type, infer_title, CHUNK_SIZE_BYTES, DEFAULT_CACHE_CONTROL,
    MAX_CONCURRENT_TRANSFERS, MAX_RETRIES, RESUMABLE_THRESHOLD_BYTES, RETRY_BASE_DELAY_MS,
};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Status string reported for failed uploads.
pub const FAILED_STATUS: &str = "failed";

/// Configuration for the upload pipeline.
///
/// Built once per process (usually `UploadConfiguration::default()`) and
/// never mutated while uploads are running.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfiguration {
    /// Files at or above this size use the resumable strategy.
    pub resumable_threshold_bytes: u64,
    /// Transfer unit for both strategies.
    pub chunk_size_bytes: u64,
    /// Retries per chunk write or resumable step (attempts = retries + 1).
    pub max_retries: u32,
    /// Maximum chunk writes in flight for the parallel strategy.
    pub max_concurrent_transfers: usize,
    /// Cache-Control metadata sent with writes.
    pub default_cache_control: String,
    /// Base delay of the exponential retry backoff.
    pub retry_base_delay: Duration,
    /// Optional wall-clock cap on the transfer phase.
    pub transfer_timeout: Option<Duration>,
}

impl Default for UploadConfiguration {
    fn default() -> Self {
        Self {
            resumable_threshold_bytes: RESUMABLE_THRESHOLD_BYTES,
            chunk_size_bytes: CHUNK_SIZE_BYTES,
            max_retries: MAX_RETRIES,
            max_concurrent_transfers: MAX_CONCURRENT_TRANSFERS,
            default_cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            transfer_timeout: None,
        }
    }
}

impl UploadConfiguration {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resumable strategy threshold.
    pub fn with_resumable_threshold(mut self, bytes: u64) -> Self {
        self.resumable_threshold_bytes = bytes;
        self
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    /// Set the per-chunk retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the parallel strategy's concurrency bound.
    pub fn with_max_concurrent_transfers(mut self, transfers: usize) -> Self {
        self.max_concurrent_transfers = transfers;
        self
    }

    /// Set the Cache-Control value sent on writes.
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.default_cache_control = cache_control.into();
        self
    }

    /// Set the base backoff delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Cap the transfer phase at `timeout`.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the first violated invariant.
    pub fn validate(&self) -> Result<(), UploadError> {
        let violation: Option<&str> = if self.chunk_size_bytes == 0 {
            Some("chunk_size_bytes must be greater than 0")
        } else if self.resumable_threshold_bytes == 0 {
            Some("resumable_threshold_bytes must be greater than 0")
        } else if self.max_concurrent_transfers == 0 {
            Some("max_concurrent_transfers must be at least 1")
        } else {
            None
        };

        match violation {
            Some(message) => Err(UploadError::InvalidConfig {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Transfer algorithm used for one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Concurrent fixed-size chunk writes.
    Parallel,
    /// A single resumable-protocol session.
    Resumable,
}

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the backend to accept the session.
    Initializing,
    /// Bytes are being written to storage.
    Transferring,
    /// Waiting for the backend to confirm the upload.
    Finalizing,
    /// The backend confirmed the upload.
    Completed,
    /// The upload ended with an error.
    Failed,
    /// The caller cancelled the transfer.
    Aborted,
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Aborted
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Initializing, Transferring) => true,
            (Transferring, Finalizing) => true,
            (Finalizing, Completed) => true,
            (Transferring, Aborted) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Caller-supplied description of the video being uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Display title of the video.
    pub title: String,
    /// Where the climb happened (gym, crag).
    pub location: String,
    /// MIME type sent to storage.
    pub mime_type: String,
}

impl UploadMetadata {
    /// Create metadata with explicit values.
    pub fn new(
        title: impl Into<String>,
        location: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Infer title and MIME type from a file reference.
    ///
    /// Falls back to `"Untitled climb"` when no title can be derived.
    pub fn from_file_name(reference: &str, location: impl Into<String>) -> Self {
        let title: String =
            infer_title(reference).unwrap_or_else(|_| "Untitled climb".to_string());
        Self {
            title,
            location: location.into(),
            mime_type: infer_mime_type(reference).to_string(),
        }
    }
}

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Upload phase reported alongside progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Backend handshake, up to 5%.
    Initializing,
    /// Byte transfer, 5% to 95%.
    Transferring,
    /// Backend confirmation pending at 95%.
    Finalizing,
    /// Upload confirmed at 100%.
    Completed,
}

/// Caller-facing progress update on the overall 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Phase that produced this update.
    pub phase: UploadPhase,
    /// Overall percent, non-decreasing across one upload.
    pub percent: u8,
}

/// Byte-level progress of a resumable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteProgress {
    /// Bytes acknowledged by the endpoint.
    pub bytes_sent: u64,
    /// Total bytes of the source.
    pub bytes_total: u64,
}

/// Options for a single object-store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Content type of the written bytes.
    pub content_type: String,
    /// Cache-Control metadata.
    pub cache_control: String,
    /// Overwrite an existing object at the same location.
    pub upsert: bool,
}

/// Successful upload outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Public URL of the uploaded object.
    pub object_url: String,
    /// Backend session identifier.
    pub session_id: String,
    /// Status declared by the backend's finalize response, verbatim.
    pub status: String,
}

/// Serializable upload outcome handed to UI code.
///
/// Serializes as `{objectUrl, sessionId, status}` or `{error, status: "failed"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadResult {
    #[serde(rename_all = "camelCase")]
    Completed {
        object_url: String,
        session_id: String,
        status: String,
    },
    Failed { error: String, status: String },
}

impl UploadResult {
    /// Build a failed result from an error.
    pub fn failed(error: &UploadError) -> Self {
        UploadResult::Failed {
            error: error.to_string(),
            status: FAILED_STATUS.to_string(),
        }
    }

    /// Status string of either variant.
    pub fn status(&self) -> &str {
        match self {
            UploadResult::Completed { status, .. } | UploadResult::Failed { status, .. } => status,
        }
    }

    /// Whether the upload succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Completed { .. })
    }
}

impl From<Result<UploadReceipt, UploadError>> for UploadResult {
    fn from(result: Result<UploadReceipt, UploadError>) -> Self {
        match result {
            Ok(receipt) => UploadResult::Completed {
                object_url: receipt.object_url,
                session_id: receipt.session_id,
                status: receipt.status,
            },
            Err(err) => UploadResult::failed(&err),
        }
    }
}

/// Body of the backend's initialize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// Video title shown in the coaching app.
    pub title: String,
    /// Where the climb was recorded.
    pub location: String,
    /// Number of chunks at the configured chunk size.
    pub total_chunks: u64,
    /// Size of the video in bytes.
    pub file_size_bytes: u64,
    /// MIME type of the video.
    pub mime_type: String,
}

/// Response of the backend's initialize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// Backend identifier of the upload session.
    pub session_id: String,
    /// Storage path the video is written to.
    pub object_location: String,
    /// URL the video is served from once confirmed.
    pub public_url: String,
    /// Resumable-protocol endpoint, required for the resumable strategy.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Extra headers (auth) for the resumable endpoint.
    #[serde(default)]
    pub endpoint_headers: HashMap<String, String>,
    /// Advisory strategy chosen by the backend.
    #[serde(default)]
    pub strategy_hint: Option<StrategyKind>,
    /// Chunk size override.
    #[serde(default)]
    pub chunk_size_bytes: Option<u64>,
}

/// Body of the backend's mark-uploaded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkUploadedRequest {
    /// Session returned by the initialize call.
    pub session_id: String,
    /// Bytes actually transferred.
    pub file_size_bytes: u64,
}

/// Response of the backend's mark-uploaded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkUploadedResponse {
    /// Opaque status, e.g. `"processing"`.
    pub status: String,
}

/// Body of the best-effort chunk progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgressUpdate {
    /// Session returned by the initialize call.
    pub session_id: String,
    /// Chunks stored so far.
    pub uploaded_chunks: u64,
}
