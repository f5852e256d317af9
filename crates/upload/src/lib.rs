//! Video upload pipeline for CruxClip.
//!
//! This crate moves a climbing video from the device to object storage and
//! registers it with the coaching backend. Every upload runs three phases:
//!
//! - **Initialize** - The backend creates an upload session and returns the
//!   object location and public URL
//! - **Transfer** - The bytes are written with one of two strategies
//! - **Finalize** - The backend is told the upload finished and starts processing
//!
//! # Strategies
//!
//! - **Parallel** - Small files are cut into fixed-size chunks and written in
//!   batches of concurrent, individually retried upserts
//! - **Resumable** - Large files go through a resumable protocol that survives
//!   transient failures by resuming from the server's acknowledged offset
//!
//! Network access is abstracted behind [`UploadBackend`], [`ObjectStore`] and
//! [`ResumableTransport`]; `cruxclip-upload-http` provides the HTTP clients.

mod chunk;
mod chunk_uploader;
mod error;
mod notifier;
mod parallel;
mod resumable;
mod retry;
mod session;
mod source;
mod strategy;
mod traits;
mod types;
mod upload;

pub use chunk::{chunk_at, chunk_location, expected_chunk_count, generate_chunks, ChunkInfo};
pub use chunk_uploader::ChunkUploader;
pub use error::{BackendError, StoreError, UploadError};
pub use notifier::ProgressNotifier;
pub use parallel::ParallelTransfer;
pub use resumable::{ResumableAbortHandle, ResumableSession};
pub use retry::backoff_delay;
pub use session::{TransferCounters, UploadSession};
pub use source::{LocalFileSource, MemoryFileSource};
pub use strategy::UploadStrategySelector;
pub use traits::{
    CredentialProvider, FileSource, ObjectStore, ResumableEndpoint, ResumableTransport,
    StaticCredentials, UploadBackend,
};
pub use types::{
    AccessToken, ByteProgress, ChunkProgressUpdate, InitializeRequest, InitializeResponse,
    MarkUploadedRequest, MarkUploadedResponse, SessionState, StrategyKind, UploadConfiguration,
    UploadMetadata, UploadPhase, UploadProgress, UploadReceipt, UploadResult, WriteOptions,
    FAILED_STATUS,
};
pub use upload::UploadOrchestrator;

// Re-export the progress plumbing callers need to observe an upload
pub use cruxclip_common::{progress_fn, FnProgress, NoOpProgress, ProgressCallback};
