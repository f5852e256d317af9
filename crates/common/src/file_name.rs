//! File-name helpers for video references.
//!
//! References arrive as plain paths (`/videos/crux.mp4`), `file://` URIs from
//! native pickers, or blob names from the web. None of these helpers touch
//! the filesystem.

use crate::constants::DEFAULT_VIDEO_MIME_TYPE;
use crate::error::PathError;

/// Extract the last path component of a file reference.
///
/// Query strings and fragments are ignored, both `/` and `\` act as separators.
///
/// # Arguments
/// * `reference` - Path or URI of the file
///
/// # Returns
/// The file name, e.g. `"send.mp4"` for `"file:///tmp/send.mp4?x=1"`.
///
/// # Errors
/// Returns error if the reference is empty or ends with a separator.
pub fn reference_file_name(reference: &str) -> Result<&str, PathError> {
    let trimmed: &str = reference.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyReference);
    }

    let without_query: &str = trimmed
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(trimmed);

    let name: &str = without_query
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(without_query);

    if name.is_empty() || name == "." || name == ".." {
        return Err(PathError::InvalidReference {
            reference: reference.to_string(),
        });
    }

    Ok(name)
}

/// Split a file name into stem and lowercase extension.
fn split_extension(name: &str) -> (&str, Option<String>) {
    match name.rfind('.') {
        // Leading dot means a hidden file, not an extension
        Some(idx) if idx > 0 && idx + 1 < name.len() => {
            (&name[..idx], Some(name[idx + 1..].to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

/// Infer a human-readable video title from a file reference.
///
/// The extension is dropped, `_`, `-` and `.` become spaces, and runs of
/// whitespace collapse to one space.
///
/// # Arguments
/// * `reference` - Path or URI of the file
///
/// # Returns
/// Title such as `"moonboard session 3"` for `"moonboard_session-3.mov"`.
///
/// # Errors
/// Returns error if no file name can be extracted.
pub fn infer_title(reference: &str) -> Result<String, PathError> {
    let name: &str = reference_file_name(reference)?;
    let (stem, _) = split_extension(name);

    let title: String = stem
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|part: &&str| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        return Err(PathError::InvalidReference {
            reference: reference.to_string(),
        });
    }

    Ok(title)
}

/// Infer the MIME type of a video from its extension.
///
/// Unknown or missing extensions fall back to `video/mp4`.
///
/// # Arguments
/// * `reference` - Path or URI of the file
pub fn infer_mime_type(reference: &str) -> &'static str {
    let extension: Option<String> = reference_file_name(reference)
        .ok()
        .and_then(|name: &str| split_extension(name).1);

    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") | Some("qt") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("3gp") => "video/3gpp",
        _ => DEFAULT_VIDEO_MIME_TYPE,
    }
}
