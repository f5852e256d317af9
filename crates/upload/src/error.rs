//! Error types for upload operations.

use thiserror::Error;

use crate::types::SessionState;

/// Errors that can end an upload.
///
/// Every failure path of [`crate::UploadOrchestrator::upload`] resolves to one
/// of these variants; nothing is reported as partial success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Missing or unusable file reference.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// No valid access credential at upload time.
    #[error("Not authenticated: sign in before uploading")]
    NotAuthenticated,

    /// The referenced file does not exist.
    #[error("File not found: {reference}")]
    FileNotFound { reference: String },

    /// The referenced file has no content.
    #[error("File is empty: {reference}")]
    EmptyFile { reference: String },

    /// Reading the local file failed after validation.
    #[error("Failed to read {reference}: {message}")]
    FileRead { reference: String, message: String },

    /// The backend rejected or never answered the initialize call.
    ///
    /// `responded` distinguishes a server-side rejection (message taken from
    /// the backend payload) from a connectivity failure.
    #[error("{message}")]
    InitializationFailed { message: String, responded: bool },

    /// A single chunk exhausted its retry budget.
    #[error("Chunk upload to {location} failed after {attempts} attempts: {message}")]
    ChunkUploadFailed {
        location: String,
        attempts: u32,
        message: String,
    },

    /// The resumable session failed.
    #[error("Transfer failed: {message}")]
    TransferFailed { message: String },

    /// Bytes were transferred but the backend did not confirm the upload.
    #[error("Upload could not be finalized: {message}")]
    FinalizationFailed { message: String },

    /// The transfer was cancelled by the caller.
    #[error("Upload cancelled")]
    Aborted,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Internal state machine violation.
    #[error("Invalid upload state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SessionState, to: SessionState },
}

impl UploadError {
    /// Map an initialize-phase backend error.
    pub fn initialization(err: BackendError) -> Self {
        UploadError::InitializationFailed {
            responded: err.responded(),
            message: err.user_message(),
        }
    }

    /// Map a finalize-phase backend error.
    pub fn finalization(err: BackendError) -> Self {
        UploadError::FinalizationFailed {
            message: err.user_message(),
        }
    }
}

/// Errors returned by the coaching backend API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    #[error("No response from server: {message}")]
    NoResponse { message: String },

    /// The server answered with a non-success status.
    #[error("Server responded with status {status}")]
    Status { status: u16, message: Option<String> },

    /// The server answered but the body could not be decoded.
    #[error("Invalid response from server: {message}")]
    InvalidResponse { message: String },

    /// The request could not be sent because the client is misconfigured
    /// (bad base URL, header or TLS setup).
    #[error("Invalid client configuration: {message}")]
    Client { message: String },
}

impl BackendError {
    /// Whether the server produced a response at all.
    pub fn responded(&self) -> bool {
        matches!(
            self,
            BackendError::Status { .. } | BackendError::InvalidResponse { .. }
        )
    }

    /// Human-readable message surfaced to the caller.
    ///
    /// A server-supplied error message is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            BackendError::Status { status, .. } => {
                format!("Server responded with an error (HTTP {status})")
            }
            BackendError::NoResponse { message } => format!(
                "No response from server, check your network connection ({message})"
            ),
            BackendError::InvalidResponse { message } => {
                format!("Invalid response from server: {message}")
            }
            BackendError::Client { message } => {
                format!("Upload client is misconfigured: {message}")
            }
        }
    }
}

/// Errors from object-store writes and resumable-protocol requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network-level failure (connection reset, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The store answered with a non-success status.
    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store answered with a malformed protocol response.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl StoreError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Network { .. } => true,
            StoreError::Rejected { status, .. } => {
                *status >= 500 || *status == 408 || *status == 409 || *status == 429
            }
            StoreError::Protocol { .. } => false,
        }
    }
}
