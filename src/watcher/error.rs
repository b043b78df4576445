//! Error types for watch startup.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from starting a filesystem watch.
///
/// Fatal to live reload only: a document whose watch failed to start can
/// still be edited and saved.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot watch path {path}: {reason}")]
    PathUnavailable { path: PathBuf, reason: String },

    #[error("Permission denied watching {path}")]
    PermissionDenied { path: PathBuf },

    #[error("OS watch limit reached for {path}: {reason}")]
    OsLimitReached { path: PathBuf, reason: String },
}

impl WatchError {
    /// Classify a notify startup failure for the given path.
    pub(crate) fn from_notify(path: &Path, e: notify::Error) -> Self {
        match &e.kind {
            notify::ErrorKind::PathNotFound => WatchError::PathUnavailable {
                path: path.to_path_buf(),
                reason: "path not found".to_string(),
            },
            notify::ErrorKind::MaxFilesWatch => WatchError::OsLimitReached {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            notify::ErrorKind::Io(io)
                if io.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                WatchError::PermissionDenied {
                    path: path.to_path_buf(),
                }
            }
            _ => WatchError::PathUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }
}
