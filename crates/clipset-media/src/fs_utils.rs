//! Filesystem helpers for idempotency checks and artifact cleanup.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// Files at or below this size are treated as truncated leftovers (10 KiB).
pub const MIN_VALID_FILE_SIZE: u64 = 10 * 1024;

/// Size of `path` in bytes, or `None` if it does not exist.
pub async fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|m| m.len())
}

/// Returns true if `path` exists and is larger than [`MIN_VALID_FILE_SIZE`].
pub async fn is_complete_file(path: &Path) -> bool {
    matches!(file_size(path).await, Some(size) if size > MIN_VALID_FILE_SIZE)
}

/// Sidecar files a previous interrupted download may have left behind.
///
/// For `dir/{id}.mp4` these are `dir/{id}.temp.mp4`, `dir/{id}.mp4.part`
/// and `dir/{id}.mp4.ytdl`.
pub fn partial_artifacts(output_path: &Path) -> Vec<PathBuf> {
    let mut artifacts = Vec::with_capacity(3);

    if let Some(stem) = output_path.file_stem() {
        let mut temp_name = stem.to_os_string();
        temp_name.push(".temp.mp4");
        artifacts.push(output_path.with_file_name(temp_name));
    }

    for suffix in [".part", ".ytdl"] {
        let mut name = output_path.as_os_str().to_os_string();
        name.push(suffix);
        artifacts.push(PathBuf::from(name));
    }

    artifacts
}

/// Remove `path` if it exists. Returns true if a file was removed.
pub async fn remove_if_exists(path: &Path) -> MediaResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove every stale sidecar of `output_path`. Returns how many were removed.
pub async fn remove_partial_artifacts(output_path: &Path) -> MediaResult<usize> {
    let mut removed = 0;
    for artifact in partial_artifacts(output_path) {
        if remove_if_exists(&artifact).await? {
            removed += 1;
        }
    }
    Ok(removed)
}
