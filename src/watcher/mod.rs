//! Filesystem change detection for a single watched document.
//!
//! # Architecture
//!
//! ```text
//! PathWatcher::start(path)
//!   - notify::RecommendedWatcher on the parent directory
//!   - raw events filtered to the target path
//!   - coalesced into one debounced ChangeSignal per burst
//!   - generation counter invalidates signals across re-arms
//!         |
//!         v
//!   ChangeSignal -> document task (reconciliation)
//! ```
//!
//! Raw OS notifications never reach the document task directly; a single
//! atomic editor save (write-temp + rename-over-target) produces several
//! low-level events that must arrive as one signal.

mod error;
mod path_watcher;

pub use error::WatchError;
pub use path_watcher::{ChangeSignal, PathWatcher, WatchHandle};
