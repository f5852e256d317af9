//! Shared error types used across CruxClip crates.

use thiserror::Error;

/// Errors raised while interpreting a local file reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The reference is empty or only whitespace.
    #[error("File reference is empty")]
    EmptyReference,

    /// The reference has no usable file name component.
    #[error("Invalid file reference: {reference}")]
    InvalidReference {
        /// The reference that was checked.
        reference: String,
    },
}
