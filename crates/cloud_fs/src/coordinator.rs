//! Coordinated file access
//!
//! The sync daemon may read or write container paths at any time, so
//! every filesystem operation first acquires a coordination scope:
//! read intent for inspections, write intent for mutations, and a
//! combined source-read/destination-write scope for transfers.
//!
//! Scopes are path-keyed reader-writer locks. An acquisition also takes
//! read guards on every ancestor between the container root and the
//! target, so operations on a parent and a child of the same subtree
//! serialize against each other instead of racing. All guards for one
//! scope are acquired in lexicographic path order, which gives a global
//! acquisition order and rules out deadlock between scopes; any wait is
//! additionally bounded by the coordination timeout.

use crate::error::{CloudError, Result};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Read,
    Write,
}

#[derive(Debug)]
enum ScopeGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

/// Held coordination scope; the underlying locks release on drop
#[derive(Debug)]
pub struct AccessScope {
    _guards: Vec<ScopeGuard>,
}

/// Path-keyed coordination primitive standing in for the host's file
/// coordinator
pub struct FileCoordinator {
    locks: DashMap<PathBuf, Arc<RwLock<()>>>,
    timeout: Duration,
}

impl FileCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Acquire read intent on `path`
    pub async fn read_intent(&self, root: &Path, path: &Path) -> Result<AccessScope> {
        self.acquire(Self::requests(root, path, Intent::Read)).await
    }

    /// Acquire write intent on `path`
    pub async fn write_intent(&self, root: &Path, path: &Path) -> Result<AccessScope> {
        self.acquire(Self::requests(root, path, Intent::Write)).await
    }

    /// Acquire read intent on `source` and write intent on `dest` as one
    /// scope, for copy/move style operations
    pub async fn transfer_intent(
        &self,
        root: &Path,
        source: &Path,
        dest: &Path,
    ) -> Result<AccessScope> {
        let mut requests = Self::requests(root, source, Intent::Read);
        requests.extend(Self::requests(root, dest, Intent::Write));
        self.acquire(requests).await
    }

    /// Drop lock-table entries no scope currently holds
    pub fn release_idle(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// The guard set for one target: read guards on each ancestor inside
    /// the container root, then the requested intent on the target itself
    fn requests(root: &Path, path: &Path, intent: Intent) -> Vec<(PathBuf, Intent)> {
        let mut requests: Vec<(PathBuf, Intent)> = path
            .ancestors()
            .skip(1)
            .take_while(|ancestor| ancestor.starts_with(root))
            .map(|ancestor| (ancestor.to_path_buf(), Intent::Read))
            .collect();
        requests.push((path.to_path_buf(), intent));
        requests
    }

    async fn acquire(&self, mut requests: Vec<(PathBuf, Intent)>) -> Result<AccessScope> {
        // Global order: sort by path, collapse duplicates (write wins) so
        // a single scope never locks the same path twice
        requests.sort_by(|a, b| a.0.cmp(&b.0));
        requests.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                if next.1 == Intent::Write {
                    kept.1 = Intent::Write;
                }
                true
            } else {
                false
            }
        });

        let deadline = Instant::now() + self.timeout;
        let mut guards = Vec::with_capacity(requests.len());

        for (path, intent) in requests {
            let lock = self
                .locks
                .entry(path.clone())
                .or_default()
                .clone();

            let guard = match intent {
                Intent::Read => timeout_at(deadline, lock.read_owned())
                    .await
                    .map(ScopeGuard::Read),
                Intent::Write => timeout_at(deadline, lock.write_owned())
                    .await
                    .map(ScopeGuard::Write),
            };

            match guard {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    tracing::warn!("Coordination timed out waiting for {}", path.display());
                    return Err(CloudError::timed_out(path));
                }
            }
        }

        Ok(AccessScope { _guards: guards })
    }
}
