//! `FileSource` implementations.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::UploadError;
use crate::traits::FileSource;

/// A video on the local filesystem (native platforms).
///
/// Accepts plain paths and `file://` URIs.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    reference: String,
    path: PathBuf,
}

impl LocalFileSource {
    /// Create a source for `reference`.
    pub fn new(reference: impl Into<String>) -> Self {
        let reference: String = reference.into();
        let path: PathBuf = PathBuf::from(
            reference
                .strip_prefix("file://")
                .unwrap_or(reference.as_str()),
        );
        Self { reference, path }
    }

    /// Resolved filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, err: std::io::Error) -> UploadError {
        if err.kind() == std::io::ErrorKind::NotFound {
            UploadError::FileNotFound {
                reference: self.reference.clone(),
            }
        } else {
            UploadError::FileRead {
                reference: self.reference.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    fn reference(&self) -> &str {
        &self.reference
    }

    async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|meta: std::fs::Metadata| meta.is_file())
            .unwrap_or(false)
    }

    async fn size(&self) -> Result<u64, UploadError> {
        let meta: std::fs::Metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e: std::io::Error| self.read_error(e))?;
        Ok(meta.len())
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, UploadError> {
        let mut file: File = File::open(&self.path)
            .await
            .map_err(|e: std::io::Error| self.read_error(e))?;

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e: std::io::Error| self.read_error(e))?;

        let mut buffer: Vec<u8> = vec![0u8; length as usize];
        file.read_exact(&mut buffer)
            .await
            .map_err(|e: std::io::Error| self.read_error(e))?;

        Ok(Bytes::from(buffer))
    }
}

/// An in-memory video (web blobs, generated content, tests).
#[derive(Debug, Clone)]
pub struct MemoryFileSource {
    reference: String,
    data: Bytes,
}

impl MemoryFileSource {
    /// Create a source named `reference` holding `data`.
    pub fn new(reference: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            reference: reference.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    fn reference(&self) -> &str {
        &self.reference
    }

    async fn exists(&self) -> bool {
        true
    }

    async fn size(&self) -> Result<u64, UploadError> {
        Ok(self.data.len() as u64)
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, UploadError> {
        let start: usize = offset as usize;
        let end: usize = offset.saturating_add(length) as usize;
        if end > self.data.len() {
            return Err(UploadError::FileRead {
                reference: self.reference.clone(),
                message: format!(
                    "range {start}..{end} exceeds blob size {}",
                    self.data.len()
                ),
            });
        }
        // Slicing shares the buffer, no copy
        Ok(self.data.slice(start..end))
    }

    async fn read_all(&self) -> Result<Bytes, UploadError> {
        Ok(self.data.clone())
    }
}
