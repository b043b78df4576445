//! Event broadcasting to document subscribers.
//!
//! This module provides the broadcast channels that fan out debounced
//! change notifications and non-fatal reconciliation warnings to any
//! number of subscribers (the rendering pipeline, a status bar, tests).

use std::path::PathBuf;
use tokio::sync::broadcast;

/// A debounced change notification carrying the latest accepted state.
///
/// Delivered after the render idle period; intermediate versions produced
/// during a burst of rapid edits are superseded, not queued.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub version: u64,
    pub content: String,
}

/// Non-fatal reconciliation issues.
///
/// These never corrupt document state; the in-memory buffer and its
/// unsaved edits are preserved in every case.
#[derive(Debug, Clone)]
pub enum ReconcileWarning {
    /// Reading the changed file kept failing past the retry bound.
    TransientReadFailure { path: PathBuf, attempts: u32 },
    /// The backing file is gone; watching has stopped, the buffer is kept.
    FileRemoved { path: PathBuf },
}

/// Fans out change and warning events for one document.
#[derive(Clone)]
pub struct DocumentBroadcaster {
    changes: broadcast::Sender<ChangeEvent>,
    warnings: broadcast::Sender<ReconcileWarning>,
}

impl DocumentBroadcaster {
    /// Create a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        let (warnings, _) = broadcast::channel(capacity);
        Self { changes, warnings }
    }

    /// Send a change event to all subscribers.
    pub fn send_change(&self, event: ChangeEvent) {
        match self.changes.send(event) {
            Ok(count) => {
                crate::debug_event!("broadcast", "change sent", "to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "change dropped", "no subscribers");
            }
        }
    }

    /// Send a warning to all subscribers.
    pub fn send_warning(&self, warning: ReconcileWarning) {
        match self.warnings.send(warning.clone()) {
            Ok(count) => {
                crate::debug_event!("broadcast", "warning sent", "{warning:?} to {count} subscribers");
            }
            Err(_) => {
                crate::debug_event!("broadcast", "warning dropped", "no subscribers for {warning:?}");
            }
        }
    }

    /// Subscribe to debounced (version, content) change notifications.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Subscribe to non-fatal reconciliation warnings.
    pub fn subscribe_warnings(&self) -> broadcast::Receiver<ReconcileWarning> {
        self.warnings.subscribe()
    }
}
