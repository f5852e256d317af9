//! Parallel chunked transfer strategy.
//!
//! Chunks are uploaded in batches of at most `max_concurrent_transfers`.
//! A batch is awaited jointly; the next batch starts only after every member
//! of the current one resolved, and never if any member failed.

use bytes::Bytes;
use cruxclip_common::{percent_of, ProgressCallback};
use futures::future::join_all;

use crate::chunk::{chunk_location, generate_chunks, ChunkInfo};
use crate::chunk_uploader::ChunkUploader;
use crate::error::UploadError;
use crate::notifier::ProgressNotifier;
use crate::session::UploadSession;
use crate::traits::FileSource;

/// Uploads a file as concurrent fixed-size chunk writes.
pub struct ParallelTransfer<'a> {
    uploader: &'a ChunkUploader,
    notifier: &'a ProgressNotifier,
    max_concurrent: usize,
}

impl<'a> ParallelTransfer<'a> {
    /// Create the strategy.
    ///
    /// # Arguments
    /// * `uploader` - Performs the individual chunk writes
    /// * `notifier` - Side channel for backend progress updates
    /// * `max_concurrent` - Batch size, at least 1
    pub fn new(
        uploader: &'a ChunkUploader,
        notifier: &'a ProgressNotifier,
        max_concurrent: usize,
    ) -> Self {
        Self {
            uploader,
            notifier,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Transfer every chunk of `source` for `session`.
    ///
    /// `progress` receives the local percent `round(completed / total * 100)`
    /// after each completed chunk. Returning `false` cancels the transfer
    /// once the current batch resolves.
    ///
    /// # Returns
    /// Total bytes transferred.
    pub async fn run(
        &self,
        source: &dyn FileSource,
        session: &UploadSession,
        progress: &dyn ProgressCallback<u8>,
    ) -> Result<u64, UploadError> {
        let chunks: Vec<ChunkInfo> =
            generate_chunks(session.total_size_bytes, session.chunk_size_bytes);
        let total_chunks: u64 = session.total_chunks;

        for batch in chunks.chunks(self.max_concurrent) {
            let results: Vec<Result<bool, UploadError>> = join_all(
                batch
                    .iter()
                    .map(|chunk: &ChunkInfo| self.upload_one(source, session, *chunk, progress)),
            )
            .await;

            let mut cancelled: bool = false;
            for result in results {
                // First failure in index order wins
                if !result? {
                    cancelled = true;
                }
            }

            if cancelled {
                log::info!(
                    "Upload {} cancelled after {} of {} chunks",
                    session.session_id,
                    session.counters.uploaded_chunks(),
                    total_chunks
                );
                return Err(UploadError::Aborted);
            }
        }

        Ok(session.counters.uploaded_bytes())
    }

    /// Read, upload and account for one chunk.
    ///
    /// # Returns
    /// Whether the progress callback asked to continue.
    async fn upload_one(
        &self,
        source: &dyn FileSource,
        session: &UploadSession,
        chunk: ChunkInfo,
        progress: &dyn ProgressCallback<u8>,
    ) -> Result<bool, UploadError> {
        let data: Bytes = source.read_range(chunk.offset, chunk.length).await?;
        let location: String =
            chunk_location(&session.object_location, chunk.index, session.total_chunks);

        self.uploader
            .upload_chunk(&location, data, &session.write_options, &session.token)
            .await?;

        let completed: u64 = session.counters.record_chunk(chunk.length);
        self.notifier.notify(&session.session_id, completed);

        Ok(progress.on_progress(&percent_of(completed, session.total_chunks)))
    }
}
