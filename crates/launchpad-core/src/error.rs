//! Error types for Launchpad.

use thiserror::Error;

use crate::ids::{HostId, SurfaceId};
use crate::logging::targets;

/// Failures reported by the native compositor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The native window could not be allocated.
    #[error("failed to create native window: {0}")]
    WindowCreation(String),

    /// The native content view could not be allocated.
    #[error("failed to create native view: {0}")]
    ViewCreation(String),

    /// The view could not be inserted into the window's view tree.
    #[error("failed to attach view: {0}")]
    Attach(String),

    /// The native window was destroyed underneath us.
    #[error("native window has been destroyed")]
    WindowDestroyed,
}

/// The main error type for Launchpad operations.
///
/// Every variant is recoverable: an operation that fails leaves the
/// registry in its last consistent state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// No live host has this id.
    #[error("host {0} not found")]
    HostNotFound(HostId),

    /// No live surface has this id.
    #[error("surface {0} not found")]
    SurfaceNotFound(SurfaceId),

    /// A surface with this id is already registered.
    #[error("surface {0} is already registered")]
    DuplicateId(SurfaceId),

    /// A detach or reattach is already running for this surface.
    #[error("a migration is already in progress for surface {0}")]
    OperationInProgress(SurfaceId),

    /// A native window or view could not be allocated.
    #[error("native resource creation failed: {0}")]
    CreationFailed(#[from] NativeError),

    /// An internal consistency check failed; the operation was aborted.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The surface kind cannot leave its host.
    #[error("surface {0} cannot be moved out of its host")]
    NotMigratable(SurfaceId),

    /// Reattach was requested for a surface that is not in a detached host.
    #[error("surface {0} is not detached")]
    NotDetached(SurfaceId),

    /// Static configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ShellError {
    /// Build an [`ShellError::InvariantViolation`], logging it at error level.
    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: targets::INVARIANT, %message, "invariant violation");
        Self::InvariantViolation(message)
    }

    /// Check if this is one of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HostNotFound(_) | Self::SurfaceNotFound(_))
    }
}

/// A specialized Result type for Launchpad operations.
pub type ShellResult<T> = std::result::Result<T, ShellError>;

/// Result type for native compositor calls.
pub type NativeResult<T> = std::result::Result<T, NativeError>;
