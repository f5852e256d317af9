//! Resumable-protocol transfer of large files.
//!
//! A session creates an upload on the endpoint, then appends the file in
//! `chunk_size` pieces at the offset the server acknowledged. A failed append
//! is retried with backoff after asking the server for its current offset,
//! so bytes that already landed are never sent twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use cruxclip_common::ProgressCallback;
use futures::future::{AbortHandle, AbortRegistration, Abortable};

use crate::error::{StoreError, UploadError};
use crate::retry::backoff_delay;
use crate::traits::{FileSource, ResumableEndpoint, ResumableTransport};
use crate::types::{ByteProgress, UploadConfiguration};

/// Cancels a running [`ResumableSession`] from anywhere.
///
/// Clones share one cancellation. A handle belongs to a single session:
/// once that session started, starting another one with the same handle
/// fails.
#[derive(Debug, Clone)]
pub struct ResumableAbortHandle {
    aborted: Arc<AtomicBool>,
    handle: AbortHandle,
    registration: Arc<Mutex<Option<AbortRegistration>>>,
}

impl ResumableAbortHandle {
    /// Create a handle that is not attached to a session yet.
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            aborted: Arc::new(AtomicBool::new(false)),
            handle,
            registration: Arc::new(Mutex::new(Some(registration))),
        }
    }

    /// Stop the transfer. The in-flight request is dropped and no further
    /// progress or success is reported.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.handle.abort();
    }

    /// Whether [`Self::abort`] was called.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Claim the registration the transfer future is wrapped with.
    fn take_registration(&self) -> Option<AbortRegistration> {
        self.registration
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }
}

impl Default for ResumableAbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// One resumable transfer against an endpoint supplied by the backend.
pub struct ResumableSession {
    transport: Arc<dyn ResumableTransport>,
    max_retries: u32,
    base_delay: Duration,
    abort: ResumableAbortHandle,
}

impl ResumableSession {
    /// Create a session.
    ///
    /// # Arguments
    /// * `transport` - Protocol implementation
    /// * `config` - Supplies the per-step retry budget and backoff base
    pub fn new(transport: Arc<dyn ResumableTransport>, config: &UploadConfiguration) -> Self {
        Self::with_abort_handle(transport, config, ResumableAbortHandle::new())
    }

    /// Create a session cancelled through a handle the caller already holds.
    ///
    /// # Arguments
    /// * `transport` - Protocol implementation
    /// * `config` - Supplies the per-step retry budget and backoff base
    /// * `abort` - Fresh handle; aborting it before `start` makes `start` fail
    pub fn with_abort_handle(
        transport: Arc<dyn ResumableTransport>,
        config: &UploadConfiguration,
        abort: ResumableAbortHandle,
    ) -> Self {
        Self {
            transport,
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            abort,
        }
    }

    /// Handle for cancelling this session.
    pub fn abort_handle(&self) -> ResumableAbortHandle {
        self.abort.clone()
    }

    /// Stop the transfer.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Transfer `source` to `endpoint`.
    ///
    /// `progress` receives `(bytes_sent, bytes_total)` after creation and
    /// after every acknowledged append. Returning `false` aborts the session.
    /// A session can be started once.
    ///
    /// # Returns
    /// Bytes acknowledged by the server (the full size on success).
    ///
    /// # Errors
    /// - `Aborted` if the session was aborted
    /// - `TransferFailed` on protocol or network failures
    /// - source read errors are passed through
    pub async fn start(
        &self,
        source: &dyn FileSource,
        endpoint: &ResumableEndpoint,
        metadata: &[(String, String)],
        chunk_size: u64,
        progress: &dyn ProgressCallback<ByteProgress>,
    ) -> Result<u64, UploadError> {
        let registration: AbortRegistration =
            self.abort.take_registration().ok_or_else(|| UploadError::TransferFailed {
                message: "resumable session already started".to_string(),
            })?;

        if self.abort.is_aborted() {
            return Err(UploadError::Aborted);
        }

        let transfer = self.transfer(source, endpoint, metadata, chunk_size.max(1), progress);
        match Abortable::new(transfer, registration).await {
            Ok(result) => result,
            Err(_aborted) => Err(UploadError::Aborted),
        }
    }

    async fn transfer(
        &self,
        source: &dyn FileSource,
        endpoint: &ResumableEndpoint,
        metadata: &[(String, String)],
        chunk_size: u64,
        progress: &dyn ProgressCallback<ByteProgress>,
    ) -> Result<u64, UploadError> {
        let total: u64 = source.size().await?;
        let upload_url: String = self.create_with_retry(endpoint, total, metadata).await?;
        log::debug!("Created resumable upload {} ({} bytes)", upload_url, total);

        let mut offset: u64 = 0;
        self.report(progress, offset, total)?;

        while offset < total {
            let length: u64 = chunk_size.min(total - offset);
            let data: Bytes = source.read_range(offset, length).await?;
            let acknowledged: u64 = self
                .patch_with_retry(endpoint, &upload_url, offset, data)
                .await?;

            if acknowledged <= offset || acknowledged > total {
                return Err(UploadError::TransferFailed {
                    message: format!(
                        "server acknowledged offset {acknowledged} after sending from {offset} (total {total})"
                    ),
                });
            }

            offset = acknowledged;
            self.report(progress, offset, total)?;
        }

        Ok(offset)
    }

    /// Deliver byte progress, turning a `false` answer into an abort.
    fn report(
        &self,
        progress: &dyn ProgressCallback<ByteProgress>,
        bytes_sent: u64,
        bytes_total: u64,
    ) -> Result<(), UploadError> {
        if self.abort.is_aborted() {
            return Err(UploadError::Aborted);
        }
        let update = ByteProgress {
            bytes_sent,
            bytes_total,
        };
        if !progress.on_progress(&update) {
            self.abort.aborted.store(true, Ordering::SeqCst);
            return Err(UploadError::Aborted);
        }
        Ok(())
    }

    async fn create_with_retry(
        &self,
        endpoint: &ResumableEndpoint,
        total: u64,
        metadata: &[(String, String)],
    ) -> Result<String, UploadError> {
        let mut attempt: u32 = 0;
        loop {
            match self.transport.create(endpoint, total, metadata).await {
                Ok(url) => return Ok(url),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    let delay: Duration = backoff_delay(attempt, self.base_delay);
                    log::debug!("Resumable create failed ({}), retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(transfer_failed("create", err)),
            }
        }
    }

    /// Append one chunk, re-negotiating the offset between retries.
    ///
    /// # Returns
    /// The server offset after the chunk, which may differ from
    /// `offset + data.len()` when a failed append partially landed.
    async fn patch_with_retry(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, UploadError> {
        let mut attempt: u32 = 0;
        loop {
            let err: StoreError = match self
                .transport
                .patch(endpoint, upload_url, offset, data.clone())
                .await
            {
                Ok(acknowledged) => return Ok(acknowledged),
                Err(err) => err,
            };

            if attempt >= self.max_retries || !err.is_retryable() {
                return Err(transfer_failed("append", err));
            }

            let delay: Duration = backoff_delay(attempt, self.base_delay);
            log::debug!(
                "Resumable append at {} failed ({}), retrying in {:?}",
                offset,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;

            match self.transport.offset(endpoint, upload_url).await {
                // The server already holds bytes past our offset
                Ok(server_offset) if server_offset > offset => return Ok(server_offset),
                Ok(_) => {}
                Err(e) => log::debug!("Offset negotiation for {} failed: {}", upload_url, e),
            }
        }
    }
}

fn transfer_failed(step: &str, err: StoreError) -> UploadError {
    log::warn!("Resumable {} failed: {}", step, err);
    UploadError::TransferFailed {
        message: err.to_string(),
    }
}
