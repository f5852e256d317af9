//! Shared types and utilities for CruxClip.
//!
//! This crate provides functionality used by every CruxClip upload crate:
//! - Upload configuration constants
//! - Generic progress callback trait and percent scaling
//! - File-name helpers (title and MIME type inference)
//! - Shared error types

pub mod constants;
pub mod error;
pub mod file_name;
pub mod progress;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::PathError;
pub use file_name::{infer_mime_type, infer_title, reference_file_name};
pub use progress::{
    percent_of, progress_fn, FnProgress, NoOpProgress, ProgressBand, ProgressCallback,
};
