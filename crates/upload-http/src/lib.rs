//! HTTP backends for the CruxClip upload pipeline.
//!
//! This crate provides reqwest implementations of the collaborator traits
//! defined in `cruxclip-upload`:
//!
//! - [`HttpBackendClient`] - The coaching backend's upload-session API
//! - [`HttpObjectStore`] - Upsert writes to the storage REST API
//! - [`TusTransport`] - The tus 1.0.0 resumable upload protocol
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cruxclip_upload::{UploadConfiguration, UploadOrchestrator};
//! use cruxclip_upload_http::{HttpBackendClient, HttpObjectStore, HttpSettings, TusTransport};
//!
//! let settings = HttpSettings::default();
//! let http = settings.build_client()?;
//! let backend = HttpBackendClient::with_client(http.clone(), "https://api.example.com/uploads")?;
//! let store = HttpObjectStore::with_client(http.clone(), "https://storage.example.com/v1", "videos")?;
//! let orchestrator = UploadOrchestrator::new(
//!     Arc::new(backend),
//!     Arc::new(store),
//!     Arc::new(TusTransport::with_client(http).with_bucket("videos")),
//!     UploadConfiguration::default(),
//! )?;
//! ```

mod backend;
mod error;
mod settings;
mod store;
mod tus;

pub use backend::{HttpBackendClient, CHUNK_PROGRESS_PATH, INITIALIZE_PATH, MARK_UPLOADED_PATH};
pub use error::HttpClientError;
pub use settings::{HttpSettings, DEFAULT_CONNECT_TIMEOUT};
pub use store::{HttpObjectStore, API_KEY_HEADER, UPSERT_HEADER};
pub use tus::{
    encode_metadata, TusTransport, OFFSET_OCTET_STREAM, TUS_RESUMABLE_HEADER, TUS_VERSION,
    UPLOAD_LENGTH_HEADER, UPLOAD_METADATA_HEADER, UPLOAD_OFFSET_HEADER,
};
