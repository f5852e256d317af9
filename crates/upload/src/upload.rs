//! Upload orchestration for climbing videos.
//!
//! This module provides the single entry point of the pipeline. It handles:
//!
//! - Fail-fast validation of the file and the caller's credential
//! - The three-phase backend handshake (initialize, transfer, mark-uploaded)
//! - Strategy selection between parallel chunk writes and a resumable session
//! - Aggregating per-phase progress into one non-decreasing 0-100 value
//! - Mapping every failure to an [`UploadError`]
//!
//! # Progress Scale
//!
//! - Initialize: reaches 5 once the backend accepted the session
//! - Transfer: the strategy's local 0-100 mapped onto 5-95
//! - Finalize: 100 once the backend confirmed the upload
//!
//! # Example
//!
//! ```ignore
//! use cruxclip_upload::{LocalFileSource, StaticCredentials, UploadMetadata, UploadOrchestrator};
//!
//! let orchestrator = UploadOrchestrator::new(backend, store, transport, config)?;
//! let source = LocalFileSource::new("/videos/moonboard.mp4");
//! let metadata = UploadMetadata::from_file_name(source.reference(), "Home wall");
//! let result: UploadResult = orchestrator
//!     .upload(&source, &metadata, &credentials, &progress)
//!     .await
//!     .into();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use cruxclip_common::{
    percent_of, progress_fn, reference_file_name, ProgressBand, ProgressCallback,
    PROGRESS_COMPLETE, PROGRESS_INITIALIZED, PROGRESS_TRANSFERRED,
};

use crate::chunk::expected_chunk_count;
use crate::chunk_uploader::ChunkUploader;
use crate::error::UploadError;
use crate::notifier::ProgressNotifier;
use crate::parallel::ParallelTransfer;
use crate::resumable::{ResumableAbortHandle, ResumableSession};
use crate::session::UploadSession;
use crate::strategy::UploadStrategySelector;
use crate::traits::{
    CredentialProvider, FileSource, ObjectStore, ResumableEndpoint, ResumableTransport,
    UploadBackend,
};
use crate::types::{
    AccessToken, ByteProgress, InitializeRequest, InitializeResponse, MarkUploadedRequest,
    MarkUploadedResponse, SessionState, StrategyKind, UploadConfiguration, UploadMetadata,
    UploadPhase, UploadProgress, UploadReceipt, WriteOptions,
};

/// Share of the overall scale owned by the transfer phase.
const TRANSFER_BAND: ProgressBand = ProgressBand::new(PROGRESS_INITIALIZED, PROGRESS_TRANSFERRED);

/// Coordinates one video upload from validation to backend confirmation.
pub struct UploadOrchestrator {
    backend: Arc<dyn UploadBackend>,
    transport: Arc<dyn ResumableTransport>,
    uploader: ChunkUploader,
    selector: UploadStrategySelector,
    config: UploadConfiguration,
    notify_chunk_progress: bool,
}

impl UploadOrchestrator {
    /// Create an orchestrator.
    ///
    /// # Arguments
    /// * `backend` - Coaching backend upload-session API
    /// * `store` - Object store for parallel chunk writes
    /// * `transport` - Resumable protocol for large files
    /// * `config` - Pipeline configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration violates its invariants.
    pub fn new(
        backend: Arc<dyn UploadBackend>,
        store: Arc<dyn ObjectStore>,
        transport: Arc<dyn ResumableTransport>,
        config: UploadConfiguration,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        Ok(Self {
            backend,
            transport,
            uploader: ChunkUploader::new(store, &config),
            selector: UploadStrategySelector::from_config(&config),
            config,
            notify_chunk_progress: true,
        })
    }

    /// Enable or disable best-effort chunk progress notifications.
    pub fn with_chunk_progress_notifications(mut self, enabled: bool) -> Self {
        self.notify_chunk_progress = enabled;
        self
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &UploadConfiguration {
        &self.config
    }

    /// Upload a video.
    ///
    /// `progress` receives non-decreasing overall percentages, ending at 100
    /// on success, and is never called after this returns. Returning `false`
    /// during the transfer cancels the upload with `Aborted`.
    ///
    /// # Arguments
    /// * `source` - The video
    /// * `metadata` - Title, location and MIME type sent to the backend
    /// * `credentials` - Current user's credential source
    /// * `progress` - Caller progress callback
    ///
    /// # Returns
    /// The public URL, session id and the backend's status on success.
    pub async fn upload(
        &self,
        source: &dyn FileSource,
        metadata: &UploadMetadata,
        credentials: &dyn CredentialProvider,
        progress: &dyn ProgressCallback<UploadProgress>,
    ) -> Result<UploadReceipt, UploadError> {
        self.upload_with_abort(
            source,
            metadata,
            credentials,
            progress,
            &ResumableAbortHandle::new(),
        )
        .await
    }

    /// Upload a video that the caller can cancel through `abort`.
    ///
    /// Aborting drops an in-flight resumable append at once. A parallel
    /// transfer stops once its current batch resolves. Either way the upload
    /// ends with `Aborted` and is never finalized. Use a fresh handle per
    /// upload.
    ///
    /// # Arguments
    /// * `source` - The video
    /// * `metadata` - Title, location and MIME type sent to the backend
    /// * `credentials` - Current user's credential source
    /// * `progress` - Caller progress callback
    /// * `abort` - Cancellation handle kept by the caller
    pub async fn upload_with_abort(
        &self,
        source: &dyn FileSource,
        metadata: &UploadMetadata,
        credentials: &dyn CredentialProvider,
        progress: &dyn ProgressCallback<UploadProgress>,
        abort: &ResumableAbortHandle,
    ) -> Result<UploadReceipt, UploadError> {
        let size: u64 = self.validate_source(source).await?;
        let token: AccessToken = credentials
            .access_token()
            .await
            .ok_or(UploadError::NotAuthenticated)?;

        // Phase 1: initialize
        let strategy: StrategyKind = self.selector.select(size);
        let request = InitializeRequest {
            title: metadata.title.clone(),
            location: metadata.location.clone(),
            total_chunks: expected_chunk_count(size, self.config.chunk_size_bytes),
            file_size_bytes: size,
            mime_type: metadata.mime_type.clone(),
        };
        log::info!(
            "Initializing upload of {} ({} bytes, {} chunks, {:?})",
            source.reference(),
            size,
            request.total_chunks,
            strategy
        );

        let response: InitializeResponse = self
            .backend
            .initialize_upload(&request, &token)
            .await
            .map_err(|e| {
                log::warn!("Upload initialization failed: {}", e);
                UploadError::initialization(e)
            })?;

        if let Some(hint) = response.strategy_hint {
            if hint != strategy {
                log::debug!(
                    "Backend suggested {:?} for session {}, using {:?}",
                    hint,
                    response.session_id,
                    strategy
                );
            }
        }

        let chunk_size: u64 = response
            .chunk_size_bytes
            .filter(|bytes: &u64| *bytes > 0)
            .unwrap_or(self.config.chunk_size_bytes);
        let write_options = WriteOptions {
            content_type: metadata.mime_type.clone(),
            cache_control: self.config.default_cache_control.clone(),
            upsert: true,
        };
        let mut session =
            UploadSession::new(&response, size, chunk_size, strategy, write_options, token);

        let gate = ProgressGate::new(progress);
        gate.emit(UploadPhase::Initializing, PROGRESS_INITIALIZED);

        // Phase 2: transfer
        session.transition(SessionState::Transferring)?;
        let notifier: ProgressNotifier = if self.notify_chunk_progress {
            ProgressNotifier::spawn(self.backend.clone(), session.token.clone())
        } else {
            ProgressNotifier::disabled()
        };

        let transfer_result: Result<u64, UploadError> = self
            .transfer_with_timeout(source, &session, &response, &notifier, &gate, abort)
            .await;
        // Queued notifications drain in the background
        drop(notifier.close());

        let transferred: u64 = match transfer_result {
            Ok(bytes) => bytes,
            Err(UploadError::Aborted) => {
                session.transition(SessionState::Aborted)?;
                log::info!("Upload {} aborted", session.session_id);
                return Err(UploadError::Aborted);
            }
            Err(e) => {
                session.fail();
                log::warn!("Upload {} transfer failed: {}", session.session_id, e);
                return Err(e);
            }
        };

        // Phase 3: finalize
        session.transition(SessionState::Finalizing)?;
        gate.emit(UploadPhase::Finalizing, PROGRESS_TRANSFERRED);
        let finalize = MarkUploadedRequest {
            session_id: session.session_id.clone(),
            file_size_bytes: transferred,
        };
        let confirmed: MarkUploadedResponse = match self
            .backend
            .mark_uploaded(&finalize, &session.token)
            .await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                // The bytes are stored but the backend has not committed to them
                session.fail();
                log::warn!("Upload {} could not be finalized: {}", session.session_id, e);
                return Err(UploadError::finalization(e));
            }
        };

        session.transition(SessionState::Completed)?;
        gate.emit(UploadPhase::Completed, PROGRESS_COMPLETE);
        log::info!(
            "Upload {} completed ({} bytes, status {})",
            session.session_id,
            transferred,
            confirmed.status
        );

        Ok(UploadReceipt {
            object_url: session.public_url.clone(),
            session_id: session.session_id.clone(),
            status: confirmed.status,
        })
    }

    /// Check the source before any network call.
    ///
    /// # Returns
    /// The source size in bytes.
    async fn validate_source(&self, source: &dyn FileSource) -> Result<u64, UploadError> {
        if source.reference().trim().is_empty() {
            return Err(UploadError::InvalidInput {
                message: "no video file selected".to_string(),
            });
        }
        if !source.exists().await {
            return Err(UploadError::FileNotFound {
                reference: source.reference().to_string(),
            });
        }
        let size: u64 = source.size().await?;
        if size == 0 {
            return Err(UploadError::EmptyFile {
                reference: source.reference().to_string(),
            });
        }
        Ok(size)
    }

    async fn transfer_with_timeout(
        &self,
        source: &dyn FileSource,
        session: &UploadSession,
        response: &InitializeResponse,
        notifier: &ProgressNotifier,
        gate: &ProgressGate<'_>,
        abort: &ResumableAbortHandle,
    ) -> Result<u64, UploadError> {
        let transfer = self.transfer(source, session, response, notifier, gate, abort);
        match self.config.transfer_timeout {
            None => transfer.await,
            Some(limit) => match tokio::time::timeout(limit, transfer).await {
                Ok(result) => result,
                Err(_elapsed) => Err(UploadError::TransferFailed {
                    message: format!("transfer did not finish within {limit:?}"),
                }),
            },
        }
    }

    async fn transfer(
        &self,
        source: &dyn FileSource,
        session: &UploadSession,
        response: &InitializeResponse,
        notifier: &ProgressNotifier,
        gate: &ProgressGate<'_>,
        abort: &ResumableAbortHandle,
    ) -> Result<u64, UploadError> {
        if abort.is_aborted() {
            return Err(UploadError::Aborted);
        }
        match session.strategy {
            StrategyKind::Parallel => {
                let progress = progress_fn(|local: &u8| {
                    !abort.is_aborted()
                        && gate.emit(UploadPhase::Transferring, TRANSFER_BAND.scale(*local))
                });
                ParallelTransfer::new(
                    &self.uploader,
                    notifier,
                    self.config.max_concurrent_transfers,
                )
                .run(source, session, &progress)
                .await
            }
            StrategyKind::Resumable => {
                let endpoint: ResumableEndpoint = self.resumable_endpoint(response, session)?;
                let metadata: Vec<(String, String)> = resumable_metadata(source, session);
                let progress = progress_fn(|p: &ByteProgress| {
                    let chunks: u64 = if p.bytes_sent >= session.total_size_bytes {
                        session.total_chunks
                    } else {
                        p.bytes_sent / session.chunk_size_bytes
                    };
                    let previous: u64 = session.counters.uploaded_chunks();
                    session.counters.advance_to(p.bytes_sent, chunks);
                    if chunks > previous {
                        notifier.notify(&session.session_id, chunks);
                    }
                    gate.emit(
                        UploadPhase::Transferring,
                        TRANSFER_BAND.scale(percent_of(p.bytes_sent, p.bytes_total)),
                    )
                });

                ResumableSession::with_abort_handle(
                    self.transport.clone(),
                    &self.config,
                    abort.clone(),
                )
                .start(
                    source,
                    &endpoint,
                    &metadata,
                    session.chunk_size_bytes,
                    &progress,
                )
                .await
            }
        }
    }

    /// Build the resumable endpoint from the initialize response.
    ///
    /// The session's bearer token is added unless the backend already
    /// supplied an authorization header.
    fn resumable_endpoint(
        &self,
        response: &InitializeResponse,
        session: &UploadSession,
    ) -> Result<ResumableEndpoint, UploadError> {
        let url: String = response
            .endpoint_url
            .clone()
            .filter(|url: &String| !url.trim().is_empty())
            .ok_or_else(|| UploadError::TransferFailed {
                message: "backend did not provide a resumable upload endpoint".to_string(),
            })?;

        let mut headers: HashMap<String, String> = response.endpoint_headers.clone();
        if !headers
            .keys()
            .any(|name: &String| name.eq_ignore_ascii_case("authorization"))
        {
            headers.insert(
                "authorization".to_string(),
                format!("Bearer {}", session.token.as_str()),
            );
        }
        headers
            .entry("x-upsert".to_string())
            .or_insert_with(|| "true".to_string());

        Ok(ResumableEndpoint { url, headers })
    }
}

/// Metadata attached to a resumable upload on creation.
fn resumable_metadata(source: &dyn FileSource, session: &UploadSession) -> Vec<(String, String)> {
    let mut metadata: Vec<(String, String)> = vec![
        ("objectName".to_string(), session.object_location.clone()),
        (
            "contentType".to_string(),
            session.write_options.content_type.clone(),
        ),
        (
            "cacheControl".to_string(),
            session.write_options.cache_control.clone(),
        ),
        ("sessionId".to_string(), session.session_id.clone()),
    ];
    if let Ok(name) = reference_file_name(source.reference()) {
        metadata.push(("filename".to_string(), name.to_string()));
    }
    metadata
}

/// Forwards overall progress to the caller, dropping any value that would
/// move backwards and remembering a cancellation request.
struct ProgressGate<'a> {
    callback: &'a dyn ProgressCallback<UploadProgress>,
    last: AtomicU8,
    cancelled: AtomicBool,
}

impl<'a> ProgressGate<'a> {
    fn new(callback: &'a dyn ProgressCallback<UploadProgress>) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Report `percent` if it is higher than anything reported so far.
    ///
    /// # Returns
    /// `false` once the caller asked to cancel.
    fn emit(&self, phase: UploadPhase, percent: u8) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let previous: u8 = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent <= previous {
            return true;
        }
        if !self.callback.on_progress(&UploadProgress { phase, percent }) {
            self.cancelled.store(true, Ordering::SeqCst);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_gate_drops_regressions() {
        let seen: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let callback = progress_fn(|p: &UploadProgress| {
            seen.lock().unwrap().push(p.percent);
            true
        });
        let gate = ProgressGate::new(&callback);

        gate.emit(UploadPhase::Initializing, 5);
        gate.emit(UploadPhase::Transferring, 50);
        gate.emit(UploadPhase::Transferring, 40);
        gate.emit(UploadPhase::Transferring, 50);
        gate.emit(UploadPhase::Completed, 100);

        assert_eq!(*seen.lock().unwrap(), vec![5, 50, 100]);
    }

    #[test]
    fn test_gate_remembers_cancellation() {
        let callback = progress_fn(|p: &UploadProgress| p.percent < 50);
        let gate = ProgressGate::new(&callback);

        assert!(gate.emit(UploadPhase::Transferring, 10));
        assert!(!gate.emit(UploadPhase::Transferring, 60));
        assert!(!gate.emit(UploadPhase::Transferring, 70));
    }

    #[test]
    fn test_transfer_band_endpoints() {
        assert_eq!(TRANSFER_BAND.scale(0), PROGRESS_INITIALIZED);
        assert_eq!(TRANSFER_BAND.scale(100), PROGRESS_TRANSFERRED);
    }
}
