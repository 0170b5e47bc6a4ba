//! Host environment seam
//!
//! The container facade never talks to the platform's account store or
//! sync daemon directly. Everything it needs from the host environment is
//! behind [`ContainerHost`]: where a ubiquity container lives on disk and
//! what the active account looks like. [`LocalHost`] is the bundled
//! implementation backed by a plain local directory, with togglable
//! account and connectivity state.

use crate::identity::IdentityToken;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Account state as reported by the host environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    /// An account is signed in with valid credentials
    SignedIn(IdentityToken),
    /// An account is present but its credentials were rejected
    CredentialsRejected,
    /// No account is signed in
    SignedOut,
}

/// Interface to the host environment managing ubiquity containers
pub trait ContainerHost: Send + Sync {
    /// Absolute on-disk location of the container, or `None` while the
    /// identifier is unknown to the host (container unavailable).
    fn container_root(&self, identifier: &str) -> Option<PathBuf>;

    /// Current account state for container access
    fn account(&self) -> AccountState;
}

/// A [`ContainerHost`] backed by a plain local directory tree.
///
/// Each container identifier maps to a subdirectory of the base
/// directory; a container is available once that subdirectory exists and
/// the host is online. Account and connectivity state can be flipped at
/// runtime, which makes this host double as the simulation harness for
/// sign-out and network-loss transitions.
pub struct LocalHost {
    base: PathBuf,
    online: RwLock<bool>,
    account: RwLock<AccountState>,
}

impl LocalHost {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            online: RwLock::new(true),
            account: RwLock::new(AccountState::SignedOut),
        }
    }

    /// Sign in with the given identity token
    pub fn sign_in(&self, token: IdentityToken) {
        *self.account.write() = AccountState::SignedIn(token);
    }

    /// Sign the active account out
    pub fn sign_out(&self) {
        *self.account.write() = AccountState::SignedOut;
    }

    /// Mark the active account's credentials as rejected
    pub fn reject_credentials(&self) {
        *self.account.write() = AccountState::CredentialsRejected;
    }

    /// Toggle simulated connectivity
    pub fn set_online(&self, online: bool) {
        *self.online.write() = online;
    }

    /// Create the on-disk directory for a container identifier
    pub fn provision_container(&self, identifier: &str) -> std::io::Result<PathBuf> {
        let root = self.base.join(identifier);
        std::fs::create_dir_all(&root)?;
        Ok(root)
    }
}

impl ContainerHost for LocalHost {
    fn container_root(&self, identifier: &str) -> Option<PathBuf> {
        if !*self.online.read() {
            return None;
        }
        let root = self.base.join(identifier);
        root.is_dir().then_some(root)
    }

    fn account(&self) -> AccountState {
        self.account.read().clone()
    }
}
