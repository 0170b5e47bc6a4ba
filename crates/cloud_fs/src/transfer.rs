//! In-memory data transfer
//!
//! Byte-buffer upload/download is layered on the whole-file primitives
//! through a temporary staging file, so both variants share one
//! coordination and error-normalization path instead of duplicating it.

use crate::coordinator::FileCoordinator;
use crate::error::{CloudError, Result};
use crate::operations::{copy_in, copy_out};
use std::path::Path;

/// Upload an in-memory buffer to a container path
pub(crate) async fn upload_data(
    coordinator: &FileCoordinator,
    root: &Path,
    staging_dir: &Path,
    data: Vec<u8>,
    dest: &Path,
) -> Result<()> {
    let staging = staging_file(staging_dir)?;
    tokio::fs::write(staging.path(), &data)
        .await
        .map_err(|e| CloudError::io(staging.path(), e))?;

    // Staging file is deleted when `staging` drops
    copy_in(coordinator, root, staging.path(), dest).await
}

/// Download a container path into an in-memory buffer
pub(crate) async fn download_data(
    coordinator: &FileCoordinator,
    root: &Path,
    staging_dir: &Path,
    source: &Path,
) -> Result<Vec<u8>> {
    let staging = staging_file(staging_dir)?;
    copy_out(coordinator, root, source, staging.path()).await?;

    tokio::fs::read(staging.path())
        .await
        .map_err(|e| CloudError::io(staging.path(), e))
}

fn staging_file(staging_dir: &Path) -> Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix("cloudgate-xfer-")
        .tempfile_in(staging_dir)
        .map_err(|e| CloudError::io(staging_dir, e))
}
