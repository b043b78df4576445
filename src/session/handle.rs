//! Public surface of an open document.
//!
//! The handle is a cheap clonable front over the document task: commands
//! go in through a channel and execute in arrival order, replies come
//! back over oneshots, and subscribers attach to the broadcast channels.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::Settings;
use crate::document::DocumentSnapshot;
use crate::events::{ChangeEvent, DocumentBroadcaster, ReconcileWarning};
use crate::save::SaveError;
use crate::watcher::PathWatcher;

use super::EditSession;
use super::actor::{Command, DocumentActor};

/// Errors opening a document.
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle to one open document.
///
/// Multiple open documents are fully independent; each handle fronts its
/// own task, watcher, and suppression state.
#[derive(Clone)]
pub struct DocumentHandle {
    path: PathBuf,
    commands: mpsc::Sender<Command>,
    broadcaster: DocumentBroadcaster,
}

impl DocumentHandle {
    /// Open the document at `path` and start watching it for external
    /// changes.
    ///
    /// A failed initial read fails the open. A failed watch start does
    /// not: the document degrades to editing and saving without live
    /// reload, and the failure is logged.
    pub async fn open(
        path: impl Into<PathBuf>,
        settings: Arc<Settings>,
    ) -> Result<Self, OpenError> {
        let path = path.into();
        let initial_content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| OpenError::Read {
                    path: path.clone(),
                    source,
                })?;

        let broadcaster = DocumentBroadcaster::new(settings.render.event_capacity);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (signal_tx, signal_rx) = mpsc::channel(settings.watcher.channel_capacity);

        let watch = match PathWatcher::start(&path, &settings.watcher, signal_tx) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(
                    "[session] live reload unavailable for {}: {e}",
                    path.display()
                );
                None
            }
        };

        let session = EditSession::open(path.clone(), initial_content);
        let actor = DocumentActor::new(
            session,
            &settings,
            broadcaster.clone(),
            watch,
            command_rx,
            signal_rx,
        );
        tokio::spawn(actor.run());

        crate::log_event!("session", "opened", "{}", path.display());

        Ok(Self {
            path,
            commands: command_tx,
            broadcaster,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a local edit. Local edits always win; there is no failure
    /// mode short of the session being closed.
    pub async fn edit(&self, new_content: impl Into<String>) {
        let command = Command::Edit {
            content: new_content.into(),
        };
        if self.commands.send(command).await.is_err() {
            tracing::warn!("[session] edit on closed session {}", self.path.display());
        }
    }

    /// Save canonical content to disk and wait for the result.
    pub async fn save(&self) -> Result<(), SaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Save { reply: reply_tx })
            .await
            .map_err(|_| SaveError::SessionClosed)?;
        reply_rx.await.map_err(|_| SaveError::SessionClosed)?
    }

    /// Point-in-time view of the document, `None` once closed.
    pub async fn snapshot(&self) -> Option<DocumentSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    /// Close the session: stops watching and cancels pending debounce
    /// timers. Edits and saves after close are rejected.
    pub async fn close(&self) {
        let _ = self.commands.send(Command::Close).await;
    }

    /// Subscribe to debounced (version, content) change notifications.
    /// This is where the rendering pipeline attaches.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.broadcaster.subscribe_changes()
    }

    /// Subscribe to non-fatal reconciliation warnings.
    pub fn subscribe_warnings(&self) -> broadcast::Receiver<ReconcileWarning> {
        self.broadcaster.subscribe_warnings()
    }
}
