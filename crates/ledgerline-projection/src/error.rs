//! Error types for the projection module.

use thiserror::Error;

/// A lifecycle transition the current application status does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionConflict {
    /// Override of an application that was never created.
    #[error("application has not been created")]
    NotCreated,

    /// A second override.
    #[error("application has already been overridden")]
    AlreadyOverridden,

    /// Creation of an application that was already overridden.
    #[error("application was overridden and cannot be re-created")]
    RecreatedAfterOverride,
}

/// Result type for transitions.
pub type Result<T> = std::result::Result<T, TransitionConflict>;
