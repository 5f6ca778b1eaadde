use std::fs;
use std::path::{Path, PathBuf};

use crate::models::config::OutputFormat;
use crate::models::error::CaptureError;

/// Replace the extension of `path` with the one `output` produces.
///
/// `talk` → `talk.mp3`, `talk.wav` → `talk.mp3`, `talk.MP3` → `talk.mp3`.
pub fn normalize_output_path(path: &Path, output: &OutputFormat) -> Result<PathBuf, CaptureError> {
    if path.file_stem().is_none_or(|stem| stem.is_empty()) {
        return Err(CaptureError::StorageError(format!(
            "output path has no file name: {:?}",
            path
        )));
    }
    Ok(path.with_extension(output.extension()))
}

/// Make sure the directory the output goes into exists.
pub fn ensure_parent_dir(path: &Path) -> Result<(), CaptureError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory {}: {}", parent.display(), e))),
        _ => Ok(()),
    }
}
