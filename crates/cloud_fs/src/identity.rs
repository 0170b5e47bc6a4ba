//! Identity and connectivity tracking
//!
//! Holds the active account identity and the container connectivity flag
//! as observable state. The host environment is the single writer: state
//! only changes when [`IdentityTracker::refresh`] runs in response to a
//! host notification. Readers may see the connectivity flag and the token
//! slightly out of step with each other; the two fields are independently
//! consistent, not jointly atomic.

use crate::host::{AccountState, ContainerHost};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identity token for the active cloud account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity transition pushed to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    pub old: Option<IdentityToken>,
    pub new: Option<IdentityToken>,
}

/// Handle for removing a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = dyn Fn(&IdentityChange) + Send + Sync;

#[derive(Debug, Default)]
struct TrackedState {
    token: Option<IdentityToken>,
    root: Option<PathBuf>,
}

/// Tracks container availability and the active account identity
pub struct IdentityTracker {
    host: Arc<dyn ContainerHost>,
    identifier: String,
    relative_root: Option<PathBuf>,
    connected: AtomicBool,
    state: RwLock<TrackedState>,
    observers: Mutex<HashMap<u64, Arc<ObserverFn>>>,
    next_observer: AtomicU64,
}

impl IdentityTracker {
    /// Create a tracker and derive the initial state from the host.
    ///
    /// An identifier unknown to the host is not an error: the tracker
    /// starts disconnected and re-derives state on the next refresh.
    pub fn new(
        host: Arc<dyn ContainerHost>,
        identifier: &str,
        relative_root: Option<&str>,
    ) -> Self {
        let tracker = Self {
            host,
            identifier: identifier.to_string(),
            relative_root: relative_root.map(PathBuf::from),
            connected: AtomicBool::new(false),
            state: RwLock::new(TrackedState::default()),
            observers: Mutex::new(HashMap::new()),
            next_observer: AtomicU64::new(1),
        };
        tracker.refresh();
        tracker
    }

    /// Re-derive connectivity and identity from the host.
    ///
    /// Called once at construction and again on every host-level account
    /// or container notification. Emits an `(old, new)` change to all
    /// observers when the identity actually transitioned.
    pub fn refresh(&self) {
        let root = self.host.container_root(&self.identifier).map(|base| {
            match &self.relative_root {
                Some(rel) => base.join(rel),
                None => base,
            }
        });
        let token = match self.host.account() {
            AccountState::SignedIn(token) => Some(token),
            AccountState::CredentialsRejected | AccountState::SignedOut => None,
        };

        let old = {
            let mut state = self.state.write();
            let old = state.token.clone();
            state.token = token.clone();
            state.root = root.clone();
            old
        };
        self.connected.store(root.is_some(), Ordering::Release);

        if old != token {
            tracing::info!(
                "Identity changed for {}: {:?} -> {:?}",
                self.identifier,
                old,
                token
            );
            let change = IdentityChange { old, new: token };
            // Snapshot outside the lock: observers may subscribe or
            // unsubscribe from within their callback
            let snapshot: Vec<Arc<ObserverFn>> =
                self.observers.lock().values().cloned().collect();
            for observer in snapshot {
                observer(&change);
            }
        }
    }

    /// Current connectivity flag
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Current identity token, `None` when signed out
    pub fn identity_token(&self) -> Option<IdentityToken> {
        self.state.read().token.clone()
    }

    /// Absolute container root, `None` while unavailable
    pub fn container_root(&self) -> Option<PathBuf> {
        self.state.read().root.clone()
    }

    /// Configured container-relative root, `None` when the facade spans
    /// the whole container
    pub fn relative_root(&self) -> Option<PathBuf> {
        self.relative_root.clone()
    }

    /// Live account state, consulted at dispatch time for credential checks
    pub fn account(&self) -> AccountState {
        self.host.account()
    }

    /// Register an observer for identity transitions
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&IdentityChange) + Send + Sync + 'static,
    {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().insert(id, Arc::new(observer));
        ObserverId(id)
    }

    /// Remove a previously registered observer
    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.lock().remove(&id.0);
    }
}
