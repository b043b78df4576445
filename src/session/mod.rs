//! Per-document edit sessions.
//!
//! Each open document is owned by exactly one tokio task (the actor in
//! [`actor`]), which executes local edits, external applies, saves, and
//! reconciliation decisions in a strict total order. That serialization is
//! what makes the [`EditSession`] invariants hold without any locking: a
//! reload can never observe an edit that has been accepted but not yet
//! reflected in canonical state, because there is no such intermediate
//! state between operations.

mod actor;
mod edit_session;
mod handle;

pub use edit_session::EditSession;
pub use handle::{DocumentHandle, OpenError};

use thiserror::Error;

use crate::document::Authority;

/// Defensive-only session errors.
///
/// Unreachable under the per-document serialization; exists so a violated
/// invariant is detected loudly in testing instead of corrupting state.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Concurrent mutation rejected: authority is {authority:?}")]
    ConcurrentEditRejected { authority: Authority },
}
