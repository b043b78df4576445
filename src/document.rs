//! Canonical document state.
//!
//! A [`Document`] is the single authoritative in-memory representation of
//! one text file. It is owned by the per-document task and mutated only
//! through the edit session, so its invariants hold without locking:
//!
//! - `version` strictly increases, bumped on every accepted mutation
//! - `disk_hash` changes exactly on open, successful save, and accepted
//!   external apply
//! - exactly one [`Authority`] value holds at any instant

use std::path::{Path, PathBuf};

use crate::hash::ContentHash;

/// Who holds the exclusive right to mutate canonical content right now.
///
/// An exhaustive enum rather than independent booleans: invalid
/// combinations are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// No mutation in progress.
    Idle,
    /// A local edit is being applied.
    UserEditing,
    /// An external change from disk is being applied.
    ApplyingExternal,
    /// A save is writing canonical content to disk.
    Saving,
}

/// Canonical state of one open document.
#[derive(Debug)]
pub struct Document {
    /// Identity; immutable for the session.
    path: PathBuf,
    /// Current canonical text.
    content: String,
    /// Bumped on every accepted mutation, local or external.
    version: u64,
    /// Hash of content as last known to be on disk.
    disk_hash: ContentHash,
    authority: Authority,
}

impl Document {
    /// Create a document from the initial disk read.
    ///
    /// The content just read *is* the disk content, so `disk_hash` starts
    /// as its hash and the document opens clean at version 0.
    pub fn open(path: PathBuf, initial_content: String) -> Self {
        let disk_hash = ContentHash::of(&initial_content);
        Self {
            path,
            content: initial_content,
            version: 0,
            disk_hash,
            authority: Authority::Idle,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn disk_hash(&self) -> &ContentHash {
        &self.disk_hash
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Derived, never stored: content differs from what is on disk.
    pub fn is_dirty(&self) -> bool {
        ContentHash::of(&self.content) != self.disk_hash
    }

    pub(crate) fn set_authority(&mut self, authority: Authority) {
        self.authority = authority;
    }

    /// Replace content and bump the version. Callers hold authority.
    pub(crate) fn replace_content(&mut self, new_content: String) {
        self.content = new_content;
        self.version += 1;
    }

    /// Record that the current content is what is now on disk.
    pub(crate) fn sync_disk_hash(&mut self) {
        self.disk_hash = ContentHash::of(&self.content);
    }

    /// Point-in-time copy for status surfaces and subscribers.
    pub fn snapshot(&self, watching: bool) -> DocumentSnapshot {
        DocumentSnapshot {
            path: self.path.clone(),
            version: self.version,
            content: self.content.clone(),
            dirty: self.is_dirty(),
            watching,
        }
    }
}

/// Point-in-time view of a document, safe to hand across tasks.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub path: PathBuf,
    pub version: u64,
    pub content: String,
    /// Content differs from the last known disk state.
    pub dirty: bool,
    /// Live reload is active; false after watch start failed or the
    /// backing file was removed.
    pub watching: bool,
}
