// SPDX-License-Identifier: MIT

//! Local disk staging for multipart file uploads.
//!
//! Uploaded file parts are written to a staging directory before being
//! pushed to the media store; the staged copy is ephemeral and removed
//! once the upload attempt finishes.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Write an uploaded file part to the staging directory.
///
/// The staged name keeps the original file name (stripped of any path
/// components) behind a random prefix so concurrent uploads never collide.
pub async fn stage_upload(
    dir: &Path,
    original_name: &str,
    data: &[u8],
) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create staging dir: {}", e)))?;

    let staged = dir.join(format!(
        "{}-{}",
        uuid::Uuid::new_v4(),
        sanitize_file_name(original_name)
    ));

    tokio::fs::write(&staged, data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;

    Ok(staged)
}

/// Remove a staged file, ignoring failures; staged data is disposable.
pub async fn discard(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %err, "Failed to remove staged file");
    }
}

/// Keep only the final path component and drop characters that could
/// escape the staging directory.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .replace("..", "");

    if base.is_empty() {
        "upload".to_string()
    } else {
        base
    }
}
