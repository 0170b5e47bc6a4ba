//! Coordinated filesystem operations
//!
//! Each operation acquires its coordination scope, performs the I/O with
//! `tokio::fs`, and maps failures onto the normalized error taxonomy.
//! These run on the background runtime; the facade is the only caller.

use crate::container_path::child_relative;
use crate::coordinator::FileCoordinator;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Attribute snapshot for a container item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Size in bytes (0 for directories on some platforms)
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds)
    pub modified: Option<i64>,
    pub is_dir: bool,
}

impl FileAttributes {
    fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        Self {
            size: metadata.len(),
            modified,
            is_dir: metadata.is_dir(),
        }
    }
}

/// Read-only metadata record for one container item.
///
/// A fresh value is produced by every listing; it has no identity beyond
/// its container-relative path and is never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFile {
    /// Container-relative path
    pub path: String,
    /// Display name (final path component)
    pub name: String,
    pub attributes: FileAttributes,
}

/// Check whether an item exists and whether it is a directory
pub(crate) async fn file_exists(
    coordinator: &FileCoordinator,
    root: &Path,
    path: &Path,
) -> Result<(bool, bool)> {
    let _scope = coordinator.read_intent(root, path).await?;
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok((true, metadata.is_dir())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((false, false)),
        Err(e) => Err(CloudError::io(path, e)),
    }
}

/// Create a directory, including missing intermediate directories
pub(crate) async fn create_directory(
    coordinator: &FileCoordinator,
    root: &Path,
    path: &Path,
) -> Result<()> {
    let _scope = coordinator.write_intent(root, path).await?;
    tracing::debug!("create_directory {}", path.display());
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| CloudError::io(path, e))
}

/// List the immediate children of a directory.
///
/// Entry order follows the underlying enumeration and is not guaranteed
/// stable. Children whose metadata cannot be read are skipped.
pub(crate) async fn list_directory(
    coordinator: &FileCoordinator,
    root: &Path,
    path: &Path,
    relative: &Path,
) -> Result<Vec<CloudFile>> {
    let _scope = coordinator.read_intent(root, path).await?;

    let mut read_dir = tokio::fs::read_dir(path)
        .await
        .map_err(|e| CloudError::io(path, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| CloudError::io(path, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        entries.push(CloudFile {
            path: child_relative(relative, &name),
            name,
            attributes: FileAttributes::from_metadata(&metadata),
        });
    }

    Ok(entries)
}

/// Remove a file, or a directory together with its contents.
///
/// Not idempotent: removing a nonexistent path fails. Callers wanting
/// idempotence pre-check with `file_exists`.
pub(crate) async fn remove_item(
    coordinator: &FileCoordinator,
    root: &Path,
    path: &Path,
) -> Result<()> {
    let _scope = coordinator.write_intent(root, path).await?;
    tracing::debug!("remove_item {}", path.display());

    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .map_err(|e| CloudError::io(path, e))?;

    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| CloudError::io(path, e))
    } else {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| CloudError::io(path, e))
    }
}

/// Copy a local file into the container (upload).
///
/// Missing parent directories of the destination are created.
pub(crate) async fn copy_in(
    coordinator: &FileCoordinator,
    root: &Path,
    source: &Path,
    dest: &Path,
) -> Result<()> {
    let _scope = coordinator.transfer_intent(root, source, dest).await?;
    tracing::debug!("copy_in {} -> {}", source.display(), dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CloudError::io(parent, e))?;
    }
    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| CloudError::io(dest, e))?;
    Ok(())
}

/// Copy a container file out to a local path (download).
///
/// Missing parent directories of the local destination are created.
pub(crate) async fn copy_out(
    coordinator: &FileCoordinator,
    root: &Path,
    source: &Path,
    dest: &Path,
) -> Result<()> {
    let _scope = coordinator.transfer_intent(root, source, dest).await?;
    tracing::debug!("copy_out {} -> {}", source.display(), dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CloudError::io(parent, e))?;
    }
    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| CloudError::io(source, e))?;
    Ok(())
}
