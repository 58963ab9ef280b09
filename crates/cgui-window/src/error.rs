//! Error types for cgui-window.

use cgui_core::GraphError;
use thiserror::Error;

/// Errors surfaced by the window graph and native backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The backend could not create the native window.
    #[error("failed to open native window: {0}")]
    OpenFailed(String),

    /// The window id is stale or the window is marked for removal.
    #[error("invalid or destroyed window")]
    StaleWindow,

    /// A window was asked to freeze itself.
    #[error("a window cannot be frozen by itself")]
    SelfFreeze,

    /// Removal was requested from inside an event handler.
    #[error("window removal cannot run while events are being dispatched")]
    DispatchInProgress,

    /// A structural tree operation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for window operations.
pub type WindowResult<T> = std::result::Result<T, WindowError>;
