//! The authority arbiter: the only code allowed to mutate canonical content.
//!
//! Both mutation entry points run to completion as a single atomic unit on
//! the document's task; no intermediate state is externally observable
//! mid-call.

use std::path::PathBuf;

use crate::document::{Authority, Document};

use super::SessionError;

/// Exclusive owner of one document's canonical state.
pub struct EditSession {
    doc: Document,
}

impl EditSession {
    /// Create a session from the initial disk read.
    pub fn open(path: PathBuf, initial_content: String) -> Self {
        Self {
            doc: Document::open(path, initial_content),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Apply a local edit. Never rejected: local edits are the user's most
    /// recent intent and always win.
    pub fn apply_local_edit(&mut self, new_content: String) {
        self.doc.set_authority(Authority::UserEditing);
        self.doc.replace_content(new_content);
        self.doc.set_authority(Authority::Idle);
    }

    /// Apply content detected on disk.
    ///
    /// Returns `false` (no-op) unless authority is idle. On success the
    /// disk hash is updated along with the content, since what was applied
    /// is by definition what the disk holds.
    pub fn apply_external_content(&mut self, new_content: String) -> bool {
        if self.doc.authority() != Authority::Idle {
            return false;
        }
        self.doc.set_authority(Authority::ApplyingExternal);
        self.doc.replace_content(new_content);
        self.doc.sync_disk_hash();
        self.doc.set_authority(Authority::Idle);
        true
    }

    /// A save completed: the current content is now the disk content.
    /// Does not touch authority; the save flow owns that transition.
    pub fn mark_saved(&mut self) {
        self.doc.sync_disk_hash();
    }

    /// Take authority for the duration of a save.
    pub fn begin_save(&mut self) -> Result<(), SessionError> {
        if self.doc.authority() != Authority::Idle {
            return Err(SessionError::ConcurrentEditRejected {
                authority: self.doc.authority(),
            });
        }
        self.doc.set_authority(Authority::Saving);
        Ok(())
    }

    /// Release save authority, success or failure.
    pub fn finish_save(&mut self) {
        self.doc.set_authority(Authority::Idle);
    }
}
