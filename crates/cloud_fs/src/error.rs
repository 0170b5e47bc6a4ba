//! Cloud container error types
//!
//! Every failure surfaced by this crate is normalized to one of four
//! codes. Callers branch on [`ErrorCode`], never on the message text.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stable numeric codes for the error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    FileAccessFailed = 100,
    FileCoordinatorTimedOut = 101,
    AuthenticationFailure = 102,
    ConnectionError = 103,
}

/// Normalized cloud container error
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("file access failed: {message}")]
    FileAccessFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("file coordination timed out: {}", path.display())]
    FileCoordinatorTimedOut { path: PathBuf },

    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// The taxonomy code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CloudError::FileAccessFailed { .. } => ErrorCode::FileAccessFailed,
            CloudError::FileCoordinatorTimedOut { .. } => ErrorCode::FileCoordinatorTimedOut,
            CloudError::AuthenticationFailure(_) => ErrorCode::AuthenticationFailure,
            CloudError::ConnectionError(_) => ErrorCode::ConnectionError,
        }
    }

    pub fn file_access<S: Into<String>>(message: S) -> Self {
        CloudError::FileAccessFailed {
            message: message.into(),
            source: None,
        }
    }

    /// File access failure with the underlying I/O cause attached
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        CloudError::FileAccessFailed {
            message: format!("{}: {}", path.as_ref().display(), source),
            source: Some(source),
        }
    }

    pub fn timed_out<P: AsRef<Path>>(path: P) -> Self {
        CloudError::FileCoordinatorTimedOut {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn authentication<S: Into<String>>(message: S) -> Self {
        CloudError::AuthenticationFailure(message.into())
    }

    pub fn connection<S: Into<String>>(message: S) -> Self {
        CloudError::ConnectionError(message.into())
    }

    /// The underlying I/O cause, if any
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            CloudError::FileAccessFailed { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}
