//! Error types for cgui-core.

use thiserror::Error;

/// Errors surfaced by tree and entity operations.
///
/// Structural mismatches (popping a node that is not a child, deleting an
/// unknown node) are not errors; those operations return `None`/`false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The node id is stale or was never part of this tree.
    #[error("invalid or destroyed node")]
    StaleNode,

    /// Attempted to make a node its own parent or ancestor.
    #[error("cannot make a node its own parent or ancestor")]
    CircularParentage,

    /// The entity's behavior type was not registered as cloneable.
    #[error("behavior type `{type_name}` is not copyable")]
    NotCopyable {
        /// Type name of the behavior that refused to clone.
        type_name: &'static str,
    },

    /// The entity's behavior is currently executing a hook.
    #[error("behavior of node is in use by a running hook")]
    BehaviorInUse,
}

/// Result type for tree and entity operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors reported by a [`ProgressSequence`](crate::progress::ProgressSequence).
#[derive(Error, Debug)]
pub enum ProgressError {
    /// The background thread could not be started.
    #[error("failed to spawn progress thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A step returned an error; later steps did not run.
    #[error("step `{label}` failed: {message}")]
    StepFailed {
        /// Label of the failing step.
        label: String,
        /// The step's error, rendered with `Display`.
        message: String,
    },

    /// Cancellation was requested before every step ran.
    #[error("progress sequence cancelled after {completed} steps")]
    Cancelled {
        /// Steps that completed before the cancellation was seen.
        completed: usize,
    },

    /// A step panicked.
    #[error("progress thread panicked")]
    Panicked,
}
