//! Trailing-edge debounce of version changes for downstream notification.
//!
//! The rendering pipeline (markup conversion, sanitization) is a
//! collaborator this engine knows nothing about; it subscribes to the
//! change events this trigger produces. Each version increment inside the
//! idle period resets the timer, so a burst of rapid edits delivers one
//! notification carrying only the final content.

use tokio::time::{Duration, Instant};

/// Debounces version increments into single downstream notifications.
///
/// The trigger only tracks the deadline and the last version it delivered;
/// the content delivered at expiry is read from the document at that
/// moment, which is what makes intermediate versions superseded rather
/// than queued.
#[derive(Debug)]
pub struct RenderTrigger {
    idle: Duration,
    deadline: Option<Instant>,
    last_delivered: Option<u64>,
}

impl RenderTrigger {
    pub fn new(idle_ms: u64) -> Self {
        Self {
            idle: Duration::from_millis(idle_ms),
            deadline: None,
            last_delivered: None,
        }
    }

    /// A version increment was accepted; restart the idle period.
    pub fn bump(&mut self) {
        self.deadline = Some(Instant::now() + self.idle);
    }

    /// Deadline for the pending notification, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The idle period elapsed. Returns whether `version` should be
    /// delivered; a version already delivered is not repeated.
    pub fn fire(&mut self, version: u64) -> bool {
        self.deadline = None;
        if self.last_delivered == Some(version) {
            return false;
        }
        self.last_delivered = Some(version);
        true
    }

    /// Cancel any pending notification. Part of session teardown.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
