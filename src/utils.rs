//! Utility functions for filenames, paths, and response bodies

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters of an unparseable error body kept for display
pub const EXCERPT_CHARS: usize = 100;

/// Get a unique path for a file, handling collisions according to the specified action
///
/// For Rename, `name.ext` becomes `name (1).ext`, `name (2).ext`, ... For
/// Skip, an existing file is an error. For Overwrite, the path is returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use stego_client::utils::get_unique_path;
/// use stego_client::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/encoded.png");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/encoded.png exists, returns /tmp/encoded (1).png
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::SaveFailed {
                    path: path.to_path_buf(),
                    reason: "file already exists and collision action is Skip".to_string(),
                });
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                Error::SaveFailed {
                    path: path.to_path_buf(),
                    reason: "cannot extract file stem".to_string(),
                }
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().ok_or_else(|| Error::SaveFailed {
                path: path.to_path_buf(),
                reason: "cannot extract parent directory".to_string(),
            })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(Error::SaveFailed {
                path: path.to_path_buf(),
                reason: format!(
                    "could not find unique filename after {} attempts",
                    MAX_RENAME_ATTEMPTS
                ),
            })
        }
    }
}

/// Extract the filename from a Content-Disposition header value
///
/// Handles `filename="x"`, `filename=x`, and RFC 5987 `filename*=UTF-8''x`.
/// The extension is kept. Returns `None` when the header names no file.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;

    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // charset'lang'encoded-filename
            let encoded = encoded.rsplit('\'').next().unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(encoded)
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        } else if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                plain = Some(name.to_string());
            }
        }
    }

    plain
}

/// Reduce a server-supplied filename to a safe bare file name
///
/// Directory components are dropped; names that would escape the download
/// directory or are empty yield `None`.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    Some(cleaned)
}

/// First `EXCERPT_CHARS` characters of a body, with "..." appended if truncated
pub fn excerpt(body: &str) -> String {
    let mut chars = body.char_indices();
    match chars.nth(EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

/// Whether a declared content type announces JSON
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}
