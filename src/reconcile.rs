//! Change reconciliation: deciding whether a detected disk change is real.
//!
//! Invoked once per debounced watcher signal. Most signals are noise:
//! echoes of our own saves, or duplicate notifications for content already
//! applied. The decision precedence filters them before any state changes:
//!
//! 1. suppression window active: self-write echo, discard
//! 2. authority not idle: discard, no retry (a persisting external change
//!    produces a fresh signal on its own)
//! 3. incoming hash equals the last known disk hash: no-op, discard
//! 4. otherwise apply the external content

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::ReconcileConfig;
use crate::document::Authority;
use crate::hash::ContentHash;

/// What to do with a debounced change signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Self-write echo inside the suppression window.
    SuppressedEcho,
    /// Another mutation holds authority; a genuine change will re-signal.
    AuthorityBusy,
    /// Content on disk matches what we already know; duplicate event.
    Unchanged,
    /// Genuine external change; apply it.
    Apply,
}

/// Outcome of reading the changed file from disk.
#[derive(Debug)]
pub enum ReadOutcome {
    Content(String),
    /// Gone after all retries; the caller stops watching and keeps the
    /// in-memory buffer.
    Removed,
    /// Still unreadable after all retries, but the file exists.
    Failed { attempts: u32, source: std::io::Error },
}

/// Filters watcher signals down to genuine external changes.
pub struct ChangeReconciler {
    max_retries: u32,
    backoff: Duration,
}

impl ChangeReconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            max_retries: config.max_read_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Classify a signal. Pure; precedence order is the contract.
    pub fn decide(
        suppression_active: bool,
        authority: Authority,
        incoming: &ContentHash,
        disk_hash: &ContentHash,
    ) -> Decision {
        if suppression_active {
            return Decision::SuppressedEcho;
        }
        if authority != Authority::Idle {
            return Decision::AuthorityBusy;
        }
        if incoming == disk_hash {
            return Decision::Unchanged;
        }
        Decision::Apply
    }

    /// Read the file, retrying transient failures with backoff.
    ///
    /// External writers briefly hold the file unreadable (or absent, mid
    /// rename) while replacing it, so not-found is retried like any other
    /// failure and only classified as removal once retries are exhausted.
    pub async fn read_current(&self, path: &Path) -> ReadOutcome {
        let mut attempt: u32 = 0;
        loop {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => return ReadOutcome::Content(content),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return if e.kind() == std::io::ErrorKind::NotFound {
                            ReadOutcome::Removed
                        } else {
                            ReadOutcome::Failed {
                                attempts: attempt,
                                source: e,
                            }
                        };
                    }
                    crate::debug_event!(
                        "reconcile",
                        "read retry",
                        "{} attempt {attempt}: {e}",
                        path.display()
                    );
                    sleep(self.backoff).await;
                }
            }
        }
    }
}
