//! Error taxonomy for the batching engine.
//!
//! There are no fatal-to-the-process conditions: every error is local and
//! recoverable at the call site. Flush handler failures never surface here;
//! handlers report their own errors and the engine makes exactly one
//! delivery attempt per batch.

use thiserror::Error;

/// Errors returned by the batching engine's public surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    /// The stack is shutting down (or already stopped) and no longer
    /// accepts items. Recoverable: the caller may drop or redirect the
    /// item; the coordinator itself is unaffected.
    #[error("stack is closed: shutdown in progress")]
    Closed,
}
