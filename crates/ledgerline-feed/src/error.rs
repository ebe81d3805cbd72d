//! Error types for the feed module.

use thiserror::Error;

use ledgerline_core::{ParseTimestampError, ValidationError};

/// Errors that can occur while fetching from a mirror.
///
/// A failed fetch yields no data for that cycle; it never touches the
/// reconciler's log or cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Transport-level error (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The mirror answered with a non-success status.
    #[error("mirror returned status {status}")]
    Status { status: u16 },

    /// The response body could not be parsed.
    #[error("invalid response body: {0}")]
    Body(String),

    /// The feed is temporarily unavailable.
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Why a single raw message could not be turned into an event.
///
/// Decode errors are per message; a batch is never aborted by one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Timestamp(#[from] ParseTimestampError),

    #[error("payload is not valid base64: {0}")]
    Base64(String),

    #[error("payload is not valid UTF-8")]
    Utf8,

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("malformed event: {0}")]
    Shape(String),

    #[error("event failed validation: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
