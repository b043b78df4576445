//! Document synchronization and change-reconciliation engine.
//!
//! Keeps one editable text document consistent across three independent
//! mutators: interactive local edits, an external program modifying the
//! backing file on disk, and the engine's own save operations. Local
//! edits are never lost, stale external reloads never clobber newer local
//! content, and the engine's own writes never trigger reload loops.
//!
//! ```ignore
//! let settings = Arc::new(Settings::load()?);
//! let doc = DocumentHandle::open("notes.md", settings).await?;
//! let mut changes = doc.subscribe_changes();
//!
//! doc.edit("# Notes\n").await;
//! doc.save().await?;
//! ```

pub mod config;
pub mod document;
pub mod events;
pub mod hash;
pub mod logging;
pub mod reconcile;
pub mod render;
pub mod save;
pub mod session;
pub mod watcher;

pub use config::Settings;
pub use document::{Authority, Document, DocumentSnapshot};
pub use events::{ChangeEvent, DocumentBroadcaster, ReconcileWarning};
pub use hash::ContentHash;
pub use reconcile::{ChangeReconciler, Decision};
pub use render::RenderTrigger;
pub use save::{SaveCoordinator, SaveError, SuppressionWindow};
pub use session::{DocumentHandle, EditSession, OpenError, SessionError};
pub use watcher::{ChangeSignal, PathWatcher, WatchError, WatchHandle};
