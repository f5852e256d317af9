//! Best-effort chunk progress side channel.
//!
//! Chunk completions are queued on an unbounded channel and forwarded to the
//! backend by a separately spawned task. The upload never awaits that task,
//! so a slow or failing progress endpoint cannot change the upload result.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::traits::UploadBackend;
use crate::types::{AccessToken, ChunkProgressUpdate};

/// Fire-and-forget forwarder of chunk progress to the backend.
pub struct ProgressNotifier {
    sender: Option<mpsc::UnboundedSender<ChunkProgressUpdate>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressNotifier {
    /// Spawn the forwarding task on the current tokio runtime.
    ///
    /// # Arguments
    /// * `backend` - Receives `update_chunk_progress` calls
    /// * `token` - Credential used for the calls
    pub fn spawn(backend: Arc<dyn UploadBackend>, token: AccessToken) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ChunkProgressUpdate>();

        let task: JoinHandle<()> = tokio::spawn(async move {
            while let Some(update) = receiver.recv().await {
                if let Err(e) = backend.update_chunk_progress(&update, &token).await {
                    log::warn!(
                        "Failed to record chunk progress for session {} ({} chunks): {}",
                        update.session_id,
                        update.uploaded_chunks,
                        e
                    );
                }
            }
        });

        Self {
            sender: Some(sender),
            task: Some(task),
        }
    }

    /// A notifier that drops every update.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            task: None,
        }
    }

    /// Queue a progress update without waiting.
    pub fn notify(&self, session_id: &str, uploaded_chunks: u64) {
        let Some(sender) = &self.sender else {
            return;
        };
        let update = ChunkProgressUpdate {
            session_id: session_id.to_string(),
            uploaded_chunks,
        };
        if sender.send(update).is_err() {
            log::debug!("Chunk progress channel closed, dropping update");
        }
    }

    /// Stop accepting updates.
    ///
    /// Already queued updates are still delivered. The returned handle
    /// resolves once the queue is drained; dropping it detaches the task.
    pub fn close(mut self) -> Option<JoinHandle<()>> {
        self.sender.take();
        self.task.take()
    }
}
