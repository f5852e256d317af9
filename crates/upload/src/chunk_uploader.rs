//! Single-chunk writes with bounded retry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{StoreError, UploadError};
use crate::retry::backoff_delay;
use crate::traits::ObjectStore;
use crate::types::{AccessToken, UploadConfiguration, WriteOptions};

/// Uploads one chunk to the object store, retrying transient failures.
///
/// Every attempt is an upsert of the same bytes to the same location, so a
/// retry after a write that actually landed is harmless.
#[derive(Clone)]
pub struct ChunkUploader {
    store: Arc<dyn ObjectStore>,
    max_retries: u32,
    base_delay: Duration,
}

impl ChunkUploader {
    /// Create an uploader.
    ///
    /// # Arguments
    /// * `store` - Object store receiving the writes
    /// * `config` - Supplies the retry budget and backoff base
    pub fn new(store: Arc<dyn ObjectStore>, config: &UploadConfiguration) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
        }
    }

    /// Maximum number of attempts per chunk.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Write `data` to `location`.
    ///
    /// Makes up to `max_retries + 1` attempts, sleeping `2^attempt * base`
    /// between them. Non-retryable store errors stop immediately.
    ///
    /// # Returns
    /// The number of attempts used.
    ///
    /// # Errors
    /// `ChunkUploadFailed` carrying the location and attempts made.
    pub async fn upload_chunk(
        &self,
        location: &str,
        data: Bytes,
        options: &WriteOptions,
        token: &AccessToken,
    ) -> Result<u32, UploadError> {
        let max_attempts: u32 = self.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let result: Result<(), StoreError> = self
                .store
                .write(location, data.clone(), options, token)
                .await;
            attempt += 1;

            let err: StoreError = match result {
                Ok(()) => {
                    if attempt > 1 {
                        log::debug!("Chunk {} uploaded after {} attempts", location, attempt);
                    }
                    return Ok(attempt);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts || !err.is_retryable() {
                log::warn!(
                    "Chunk {} failed after {} attempt(s): {}",
                    location,
                    attempt,
                    err
                );
                return Err(UploadError::ChunkUploadFailed {
                    location: location.to_string(),
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            let delay: Duration = backoff_delay(attempt - 1, self.base_delay);
            log::debug!(
                "Chunk {} attempt {} failed ({}), retrying in {:?}",
                location,
                attempt,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
