//! Atomic saves with self-write suppression.
//!
//! Content is written to a temporary file in the target's own directory
//! (same filesystem, so the rename is atomic) and renamed over the target.
//! The target path is never observable in a partially-written state, which
//! is the same pattern external editors use and the watcher already
//! normalizes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::SaveConfig;

/// Errors from writing canonical content to disk.
///
/// Returned synchronously to the caller of `save()`; the in-memory buffer
/// and its dirty state are left untouched, so no data is lost on failure.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Disk full while saving {path}")]
    DiskFull { path: PathBuf },

    #[error("Permission denied saving {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to write temporary file for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to rename temporary file over {path}: {source}")]
    RenameFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Save rejected: {reason}")]
    Rejected { reason: String },

    #[error("Document session is closed")]
    SessionClosed,
}

/// Time-bounded interval during which detected changes are presumed to be
/// echoes of our own write.
///
/// Derived from an absolute expiry timestamp, never a sticky flag: if a
/// save never produces its expected follow-up event, the window simply
/// lapses and reconciliation resumes on its own.
#[derive(Debug, Default)]
pub struct SuppressionWindow {
    expires_at: Option<Instant>,
}

impl SuppressionWindow {
    pub fn arm(&mut self, window: Duration) {
        self.expires_at = Some(Instant::now() + window);
    }

    pub fn active(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() < t)
    }
}

/// Writes document content to disk atomically.
pub struct SaveCoordinator {
    suppression: Duration,
    failed_suppression: Duration,
}

impl SaveCoordinator {
    pub fn new(config: &SaveConfig) -> Self {
        Self {
            suppression: Duration::from_millis(config.suppression_ms),
            failed_suppression: Duration::from_millis(config.failed_suppression_ms),
        }
    }

    /// Suppression window to arm after a successful save.
    pub fn suppression_window(&self) -> Duration {
        self.suppression
    }

    /// Shorter window armed after a failed save, so a torn write cannot
    /// start a spurious external-change cycle.
    pub fn failure_window(&self) -> Duration {
        self.failed_suppression
    }

    /// Write `content` to `path` atomically.
    ///
    /// The blocking write and rename run on the blocking pool; the caller
    /// applies the result back on the document's serial context.
    pub async fn write_atomic(&self, path: &Path, content: String) -> Result<(), SaveError> {
        let target = path.to_path_buf();
        let join_path = target.clone();
        tokio::task::spawn_blocking(move || write_atomic_blocking(&target, &content))
            .await
            .map_err(|e| SaveError::WriteFailed {
                path: join_path,
                source: std::io::Error::other(e),
            })?
    }
}

fn write_atomic_blocking(path: &Path, content: &str) -> Result<(), SaveError> {
    // Temp file in the target's directory: same filesystem, atomic rename.
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| classify_io(e, path))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| classify_io(e, path))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| classify_io(e, path))?;

    temp.persist(path).map_err(|e| {
        let source = e.error;
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => SaveError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SaveError::RenameFailed {
                path: path.to_path_buf(),
                source,
            },
        }
    })?;

    Ok(())
}

fn classify_io(e: std::io::Error, path: &Path) -> SaveError {
    match e.kind() {
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
            SaveError::DiskFull {
                path: path.to_path_buf(),
            }
        }
        std::io::ErrorKind::PermissionDenied => SaveError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SaveError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}
