//! Cloud container facade
//!
//! [`CloudContainer`] is the public entry point: it validates arguments
//! synchronously, gates on connectivity and credentials, resolves
//! container-relative paths, and hands the coordinated operation to the
//! background executor. Every call yields an [`OperationHandle`] whose
//! completion fires exactly once with either a result or a normalized
//! error.

use crate::config::CloudConfig;
use crate::container_path;
use crate::coordinator::FileCoordinator;
use crate::error::{CloudError, Result};
use crate::executor::{Executor, OperationHandle};
use crate::host::{AccountState, ContainerHost};
use crate::identity::{IdentityChange, IdentityToken, IdentityTracker, ObserverId};
use crate::operations::{self, CloudFile};
use crate::transfer;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Asynchronous facade over one ubiquity container.
///
/// Paths given to the operation surface are container-relative. Parent
/// directories are created implicitly by `create_directory`,
/// `upload_file`, and `upload_data`; `remove_item` is strict and fails
/// on a nonexistent path.
pub struct CloudContainer {
    tracker: Arc<IdentityTracker>,
    coordinator: Arc<FileCoordinator>,
    executor: Executor,
    config: CloudConfig,
}

impl CloudContainer {
    /// Open a container by identifier with default configuration.
    ///
    /// An identifier unknown to the host is not an error: the container
    /// starts disconnected and becomes available once the host reports
    /// it (see [`handle_container_change`](Self::handle_container_change)).
    pub fn new(host: Arc<dyn ContainerHost>, identifier: &str) -> Result<Self> {
        Self::with_config(host, identifier, None, CloudConfig::default())
    }

    /// Open a container scoped to a root directory inside it
    pub fn with_root(
        host: Arc<dyn ContainerHost>,
        identifier: &str,
        relative_root: &str,
    ) -> Result<Self> {
        Self::with_config(host, identifier, Some(relative_root), CloudConfig::default())
    }

    pub fn with_config(
        host: Arc<dyn ContainerHost>,
        identifier: &str,
        relative_root: Option<&str>,
        config: CloudConfig,
    ) -> Result<Self> {
        let tracker = Arc::new(IdentityTracker::new(host, identifier, relative_root));
        let coordinator = Arc::new(FileCoordinator::new(config.coordination_timeout()));
        let executor = Executor::new(config.worker_threads)
            .map_err(|e| CloudError::file_access(format!("failed to start I/O runtime: {}", e)))?;

        Ok(Self {
            tracker,
            coordinator,
            executor,
            config,
        })
    }

    /// Current connectivity flag
    pub fn is_connected(&self) -> bool {
        self.tracker.is_connected()
    }

    /// Identity token of the active account, `None` when signed out
    pub fn identity_token(&self) -> Option<IdentityToken> {
        self.tracker.identity_token()
    }

    /// Container-relative root directory this facade is scoped to,
    /// `None` when it spans the whole container
    pub fn root_directory_path(&self) -> Option<PathBuf> {
        self.tracker.relative_root()
    }

    /// Absolute on-disk location of the (scoped) container root, `None`
    /// while the container is unavailable
    pub fn root_location(&self) -> Option<PathBuf> {
        self.tracker.container_root()
    }

    /// Re-derive connectivity and identity after a host-level account or
    /// container notification
    pub fn handle_container_change(&self) {
        self.tracker.refresh();
    }

    /// Observe identity transitions as `(old, new)` pairs
    pub fn subscribe_identity<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&IdentityChange) + Send + Sync + 'static,
    {
        self.tracker.subscribe(observer)
    }

    pub fn unsubscribe_identity(&self, id: ObserverId) {
        self.tracker.unsubscribe(id)
    }

    /// Does an item exist at the path, and is it a directory?
    pub fn file_exists(&self, path: &str) -> OperationHandle<(bool, bool)> {
        self.dispatch(path, |coordinator, root, absolute, _relative| async move {
            operations::file_exists(&coordinator, &root, &absolute).await
        })
    }

    /// Create a directory (and missing intermediate directories)
    pub fn create_directory(&self, path: &str) -> OperationHandle<()> {
        self.dispatch(path, |coordinator, root, absolute, _relative| async move {
            operations::create_directory(&coordinator, &root, &absolute).await
        })
    }

    /// List the immediate children of a directory. Pass `"."` for the
    /// container root.
    pub fn list_directory(&self, path: &str) -> OperationHandle<Vec<CloudFile>> {
        self.dispatch(path, |coordinator, root, absolute, relative| async move {
            operations::list_directory(&coordinator, &root, &absolute, &relative).await
        })
    }

    /// Remove a file, or a directory and its contents. Fails on a
    /// nonexistent path.
    pub fn remove_item(&self, path: &str) -> OperationHandle<()> {
        self.dispatch(path, |coordinator, root, absolute, _relative| async move {
            operations::remove_item(&coordinator, &root, &absolute).await
        })
    }

    /// Upload a local file to a container path
    pub fn upload_file(&self, local: &Path, to: &str) -> OperationHandle<()> {
        let local = local.to_path_buf();
        self.dispatch(to, |coordinator, root, absolute, _relative| async move {
            operations::copy_in(&coordinator, &root, &local, &absolute).await
        })
    }

    /// Download a container path to a local file
    pub fn download_file(&self, from: &str, local: &Path) -> OperationHandle<()> {
        let local = local.to_path_buf();
        self.dispatch(from, |coordinator, root, absolute, _relative| async move {
            operations::copy_out(&coordinator, &root, &absolute, &local).await
        })
    }

    /// Upload an in-memory buffer to a container path
    pub fn upload_data(&self, data: Vec<u8>, to: &str) -> OperationHandle<()> {
        let staging_dir = self.staging_dir();
        self.dispatch(to, |coordinator, root, absolute, _relative| async move {
            transfer::upload_data(&coordinator, &root, &staging_dir, data, &absolute).await
        })
    }

    /// Download a container path into an in-memory buffer
    pub fn download_data(&self, from: &str) -> OperationHandle<Vec<u8>> {
        let staging_dir = self.staging_dir();
        self.dispatch(from, |coordinator, root, absolute, _relative| async move {
            transfer::download_data(&coordinator, &root, &staging_dir, &absolute).await
        })
    }

    fn staging_dir(&self) -> PathBuf {
        self.config
            .staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Gate, resolve, and submit one operation.
    ///
    /// Validation failures complete the handle synchronously, without a
    /// background hop; everything else runs on the executor.
    fn dispatch<T, F, Fut>(&self, relative: &str, op: F) -> OperationHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<FileCoordinator>, PathBuf, PathBuf, PathBuf) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if !self.tracker.is_connected() {
            return OperationHandle::ready(Err(CloudError::connection(
                "container unavailable",
            )));
        }
        if self.tracker.account() == AccountState::CredentialsRejected {
            return OperationHandle::ready(Err(CloudError::authentication(
                "credentials rejected for container",
            )));
        }
        // The connectivity flag and the root are read separately; the
        // root may have gone away in between
        let root = match self.tracker.container_root() {
            Some(root) => root,
            None => {
                return OperationHandle::ready(Err(CloudError::connection(
                    "container unavailable",
                )))
            }
        };
        let normalized = match container_path::validate_relative(relative) {
            Ok(normalized) => normalized,
            Err(e) => return OperationHandle::ready(Err(e)),
        };

        tracing::debug!("dispatch {} in {}", relative, root.display());
        let absolute = root.join(&normalized);
        let coordinator = self.coordinator.clone();
        let operation = op(coordinator.clone(), root, absolute, normalized);

        self.executor.submit(async move {
            let result = operation.await;
            coordinator.release_idle();
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::LocalHost;
    use std::sync::Once;

    const IDENTIFIER: &str = "com.example.notes";

    fn init_test_logging() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = cloud_log::init();
        });
    }

    fn container() -> (tempfile::TempDir, Arc<LocalHost>, CloudContainer) {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(LocalHost::new(dir.path()));
        host.provision_container(IDENTIFIER).unwrap();
        host.sign_in(IdentityToken::new("user-a"));

        let config = CloudConfig {
            coordination_timeout_ms: 2_000,
            worker_threads: 2,
            staging_dir: None,
        };
        let cloud =
            CloudContainer::with_config(host.clone(), IDENTIFIER, None, config).unwrap();
        (dir, host, cloud)
    }

    #[test]
    fn test_create_directory_then_exists() {
        let (_dir, _host, cloud) = container();

        cloud.create_directory("projects/2024").wait().unwrap();
        let (exists, is_dir) = cloud.file_exists("projects/2024").wait().unwrap();
        assert!(exists);
        assert!(is_dir);

        let (exists, is_dir) = cloud.file_exists("projects/2025").wait().unwrap();
        assert!(!exists);
        assert!(!is_dir);
    }

    #[test]
    fn test_upload_data_round_trip() {
        let (_dir, _host, cloud) = container();
        let payload = vec![0x41, 0x42, 0x43];

        // Parent directory is created implicitly
        cloud.upload_data(payload.clone(), "notes/a.txt").wait().unwrap();

        let entries = cloud.list_directory("notes").wait().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "notes/a.txt");
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].attributes.size, 3);
        assert!(!entries[0].attributes.is_dir);

        let back = cloud.download_data("notes/a.txt").wait().unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_upload_and_download_file() {
        let (_dir, _host, cloud) = container();
        let scratch = tempfile::tempdir().unwrap();

        let source = scratch.path().join("source.bin");
        std::fs::write(&source, b"file payload").unwrap();

        cloud.upload_file(&source, "backups/source.bin").wait().unwrap();
        let (exists, _) = cloud.file_exists("backups/source.bin").wait().unwrap();
        assert!(exists);

        let target = scratch.path().join("restored.bin");
        cloud.download_file("backups/source.bin", &target).wait().unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"file payload");
    }

    #[test]
    fn test_remove_is_strict_and_recursive() {
        let (_dir, _host, cloud) = container();

        let err = cloud.remove_item("missing.txt").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);

        cloud.upload_data(b"x".to_vec(), "tree/inner/leaf.txt").wait().unwrap();
        cloud.remove_item("tree").wait().unwrap();
        let (exists, _) = cloud.file_exists("tree").wait().unwrap();
        assert!(!exists);
    }

    #[test]
    fn test_listing_a_file_fails() {
        let (_dir, _host, cloud) = container();
        cloud.upload_data(b"x".to_vec(), "plain.txt").wait().unwrap();

        let err = cloud.list_directory("plain.txt").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);

        let err = cloud.list_directory("no-such-dir").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);
    }

    #[test]
    fn test_listing_the_container_root() {
        let (_dir, _host, cloud) = container();
        cloud.upload_data(b"x".to_vec(), "top.txt").wait().unwrap();

        let entries = cloud.list_directory(".").wait().unwrap();
        let top = entries.iter().find(|e| e.name == "top.txt").unwrap();
        assert_eq!(top.path, "top.txt");
    }

    #[test]
    fn test_traversal_and_empty_paths_rejected() {
        let (_dir, _host, cloud) = container();

        let err = cloud.file_exists("").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);

        let err = cloud.upload_data(b"x".to_vec(), "../outside.txt").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);
    }

    #[test]
    fn test_disconnected_fails_without_touching_the_filesystem() {
        let (_dir, host, cloud) = container();

        host.set_online(false);
        cloud.handle_container_change();
        assert!(!cloud.is_connected());

        let err = cloud.upload_data(b"x".to_vec(), "offline.txt").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionError);

        host.set_online(true);
        cloud.handle_container_change();
        let (exists, _) = cloud.file_exists("offline.txt").wait().unwrap();
        assert!(!exists, "no filesystem access may happen while offline");
    }

    #[test]
    fn test_rejected_credentials_fail_with_authentication_error() {
        let (_dir, host, cloud) = container();

        host.reject_credentials();
        let err = cloud.list_directory(".").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthenticationFailure);
    }

    #[test]
    fn test_unknown_container_becomes_available_later() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(LocalHost::new(dir.path()));
        host.sign_in(IdentityToken::new("user-a"));

        // Unknown identifier: constructed fine, just disconnected
        let cloud = CloudContainer::new(host.clone(), IDENTIFIER).unwrap();
        assert!(!cloud.is_connected());
        let err = cloud.file_exists("a.txt").wait().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionError);

        host.provision_container(IDENTIFIER).unwrap();
        cloud.handle_container_change();
        assert!(cloud.is_connected());
        cloud.upload_data(b"hi".to_vec(), "a.txt").wait().unwrap();
        assert_eq!(cloud.download_data("a.txt").wait().unwrap(), b"hi");
    }

    #[test]
    fn test_relative_root_scopes_all_operations() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(LocalHost::new(dir.path()));
        let base = host.provision_container(IDENTIFIER).unwrap();
        host.sign_in(IdentityToken::new("user-a"));

        let cloud = CloudContainer::with_root(host, IDENTIFIER, "Documents").unwrap();
        assert_eq!(cloud.root_directory_path(), Some(PathBuf::from("Documents")));
        assert_eq!(cloud.root_location(), Some(base.join("Documents")));

        cloud.upload_data(b"scoped".to_vec(), "a.txt").wait().unwrap();
        assert!(base.join("Documents/a.txt").is_file());
    }

    #[test]
    fn test_unscoped_facade_has_no_relative_root() {
        let (_dir, _host, cloud) = container();
        assert_eq!(cloud.root_directory_path(), None);
        assert!(cloud.root_location().is_some());
    }

    #[test]
    fn test_identity_changes_reach_facade_observers() {
        let (_dir, host, cloud) = container();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = cloud.subscribe_identity(move |change| sink.lock().push(change.clone()));

        host.sign_in(IdentityToken::new("user-b"));
        cloud.handle_container_change();
        assert_eq!(cloud.identity_token(), Some(IdentityToken::new("user-b")));

        let changes = seen.lock().clone();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, Some(IdentityToken::new("user-a")));
        assert_eq!(changes[0].new, Some(IdentityToken::new("user-b")));

        cloud.unsubscribe_identity(id);
    }

    #[test]
    fn test_handles_can_be_awaited_from_async_callers() {
        let (_dir, _host, cloud) = container();
        cloud.upload_data(b"async".to_vec(), "from-async.txt").wait().unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let data = rt.block_on(cloud.download_data("from-async.txt")).unwrap();
        assert_eq!(data, b"async");
    }
}
