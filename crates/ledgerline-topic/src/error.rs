//! Error types for the topic module.

use thiserror::Error;

/// Errors that can occur when publishing to a topic.
///
/// A failed publish never mutates local state: the caller sees the error and
/// nothing was appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The operator is not allowed to submit to this topic.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ledger could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The ledger refused the submission.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The event could not be encoded for the wire.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;
