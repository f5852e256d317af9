//! Per-call upload session state.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::UploadError;
use crate::types::{AccessToken, InitializeResponse, SessionState, StrategyKind, WriteOptions};

/// Monotonic transfer counters.
///
/// Written only by the active strategy, read by progress aggregation.
#[derive(Debug, Default)]
pub struct TransferCounters {
    uploaded_bytes: AtomicU64,
    uploaded_chunks: AtomicU64,
}

impl TransferCounters {
    /// Record one completed chunk of `length` bytes.
    ///
    /// # Returns
    /// The completed chunk count including this one.
    pub fn record_chunk(&self, length: u64) -> u64 {
        self.uploaded_bytes.fetch_add(length, Ordering::SeqCst);
        self.uploaded_chunks.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Raise the counters to an acknowledged byte offset.
    ///
    /// Lower values are ignored so the counters never move backwards.
    pub fn advance_to(&self, bytes: u64, chunks: u64) {
        self.uploaded_bytes.fetch_max(bytes, Ordering::SeqCst);
        self.uploaded_chunks.fetch_max(chunks, Ordering::SeqCst);
    }

    /// Bytes transferred so far.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes.load(Ordering::SeqCst)
    }

    /// Chunks transferred so far.
    pub fn uploaded_chunks(&self) -> u64 {
        self.uploaded_chunks.load(Ordering::SeqCst)
    }
}

/// One upload attempt, from backend initialization to its terminal state.
///
/// Lives only for the duration of one `upload` call; the backend is the
/// durable record. A retried upload gets a new session.
#[derive(Debug)]
pub struct UploadSession {
    /// Identifier issued by the backend.
    pub session_id: String,
    /// Destination key in the object store.
    pub object_location: String,
    /// Public URL of the finished object.
    pub public_url: String,
    /// Size of the source, fixed at creation.
    pub total_size_bytes: u64,
    /// Transfer unit used by the strategy.
    pub chunk_size_bytes: u64,
    /// Number of chunks announced to the backend.
    pub total_chunks: u64,
    /// Strategy chosen for this session.
    pub strategy: StrategyKind,
    /// Options applied to every object write.
    pub write_options: WriteOptions,
    /// Credential used for every call of this session.
    pub token: AccessToken,
    /// Progress counters.
    pub counters: TransferCounters,
    state: SessionState,
}

impl UploadSession {
    /// Create a session from the backend's initialize response.
    ///
    /// The session starts in `Initializing`; call [`Self::transition`] to
    /// enter `Transferring`.
    pub fn new(
        response: &InitializeResponse,
        total_size_bytes: u64,
        chunk_size_bytes: u64,
        strategy: StrategyKind,
        write_options: WriteOptions,
        token: AccessToken,
    ) -> Self {
        Self {
            session_id: response.session_id.clone(),
            object_location: response.object_location.clone(),
            public_url: response.public_url.clone(),
            total_size_bytes,
            chunk_size_bytes,
            total_chunks: crate::chunk::expected_chunk_count(total_size_bytes, chunk_size_bytes),
            strategy,
            write_options,
            token,
            counters: TransferCounters::default(),
            state: SessionState::Initializing,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, enforcing the session state machine.
    ///
    /// # Errors
    /// `InvalidStateTransition` if the move skips a phase or leaves a
    /// terminal state.
    pub fn transition(&mut self, next: SessionState) -> Result<(), UploadError> {
        if !self.state.can_transition_to(next) {
            return Err(UploadError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!(
            "Upload session {}: {:?} -> {:?}",
            self.session_id,
            self.state,
            next
        );
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
        }
    }
}
