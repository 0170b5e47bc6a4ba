//! CloudGate Cloud Container Access Layer
//!
//! An asynchronous facade over a cloud-synchronized filesystem container,
//! including:
//! - CloudContainer: the public operation surface (exists, create, list,
//!   remove, upload/download of files and byte buffers)
//! - Coordinated access scopes so operations never race the sync daemon
//! - Identity and connectivity tracking with change observation
//! - A four-code normalized error taxonomy
//!
//! All operations run on a dedicated background runtime and complete
//! through an [`OperationHandle`] exactly once.

mod cloud;
mod config;
mod container_path;
mod coordinator;
mod error;
mod executor;
mod host;
mod identity;
mod operations;
mod transfer;

pub use cloud::CloudContainer;
pub use config::CloudConfig;
pub use container_path::{resolve, validate_relative};
pub use coordinator::{AccessScope, FileCoordinator};
pub use error::{CloudError, ErrorCode, Result};
pub use executor::OperationHandle;
pub use host::{AccountState, ContainerHost, LocalHost};
pub use identity::{IdentityChange, IdentityToken, IdentityTracker, ObserverId};
pub use operations::{CloudFile, FileAttributes};
