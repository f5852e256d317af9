//! Shared constants used across CruxClip crates.

/// Files at or above this size (6MB) go through the resumable protocol.
/// Smaller files are written directly as concurrent fixed-size chunks.
pub const RESUMABLE_THRESHOLD_BYTES: u64 = 6 * 1024 * 1024;

/// Transfer unit for both strategies (6MB).
///
/// Kept equal to [`RESUMABLE_THRESHOLD_BYTES`] so that the parallel strategy
/// always writes a single object, but the two values are independent.
pub const CHUNK_SIZE_BYTES: u64 = 6 * 1024 * 1024;

/// Retry budget per chunk write or resumable step.
pub const MAX_RETRIES: u32 = 3;

/// Maximum number of chunk writes in flight for the parallel strategy.
pub const MAX_CONCURRENT_TRANSFERS: usize = 3;

/// Cache-Control value sent with every object write (seconds).
pub const DEFAULT_CACHE_CONTROL: &str = "3600";

/// Base delay for exponential retry backoff, in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// MIME type used when the file extension is unknown.
pub const DEFAULT_VIDEO_MIME_TYPE: &str = "video/mp4";

/// Progress percent reached once the backend accepted the upload session.
pub const PROGRESS_INITIALIZED: u8 = 5;

/// Progress percent reached once every byte has been transferred.
pub const PROGRESS_TRANSFERRED: u8 = 95;

/// Progress percent of a finalized upload.
pub const PROGRESS_COMPLETE: u8 = 100;
