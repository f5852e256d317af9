//! Chunk math for video uploads.
//!
//! Pure logic for splitting a file into chunks and naming chunk locations.
//! No I/O operations.

/// A contiguous byte range `[offset, offset + length)` of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Zero-based chunk index.
    pub index: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length of this chunk in bytes.
    pub length: u64,
}

impl ChunkInfo {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Compute the byte range of chunk `index`.
///
/// The range starts at `index * chunk_size` and is clamped to `total_size`,
/// so the last chunk may be shorter. Returns `None` past the end of the file
/// or when `chunk_size` is 0.
pub fn chunk_at(index: u64, total_size: u64, chunk_size: u64) -> Option<ChunkInfo> {
    if chunk_size == 0 {
        return None;
    }
    let offset: u64 = index.checked_mul(chunk_size)?;
    if offset >= total_size {
        return None;
    }
    Some(ChunkInfo {
        index,
        offset,
        length: chunk_size.min(total_size - offset),
    })
}

/// Generate chunk information for a file.
///
/// Splits a file of `size` bytes into chunks of `chunk_size` bytes.
/// The last chunk may be smaller than `chunk_size`.
///
/// # Arguments
/// * `size` - Total file size in bytes
/// * `chunk_size` - Size of each chunk
///
/// # Returns
/// Chunks in index order. Empty for an empty file.
pub fn generate_chunks(size: u64, chunk_size: u64) -> Vec<ChunkInfo> {
    (0..expected_chunk_count(size, chunk_size))
        .filter_map(|index: u64| chunk_at(index, size, chunk_size))
        .collect()
}

/// Number of chunks announced to the backend: `max(1, ceil(size / chunk_size))`.
///
/// A zero `chunk_size` means the whole file is one chunk.
pub fn expected_chunk_count(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 || size == 0 {
        return 1;
    }
    size.div_ceil(chunk_size)
}

/// Object-store location of chunk `index` for an upload.
///
/// A single-chunk upload writes straight to `object_location`; multi-chunk
/// uploads write zero-padded part objects next to it, which keeps a retried
/// chunk addressed at the same key.
pub fn chunk_location(object_location: &str, index: u64, total_chunks: u64) -> String {
    if total_chunks <= 1 {
        object_location.to_string()
    } else {
        format!("{object_location}.part{index:05}")
    }
}
