//! Error types for the runtime crate.

use thiserror::Error;

/// Errors that can occur in the runtime host.
#[derive(Debug, Error)]
pub enum HostError {
    /// A UI operation was called off the UI thread.
    #[error("operation must run on the UI thread")]
    NotOnUiThread,

    /// The UI dispatcher has shut down.
    #[error("UI dispatcher closed")]
    DispatcherClosed,

    /// The instance creator could not provide an instance.
    #[error("instance creation failed: {0}")]
    InstanceCreation(String),

    /// Host state lock was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The UI thread could not be spawned.
    #[error("failed to spawn UI thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, HostError>;
