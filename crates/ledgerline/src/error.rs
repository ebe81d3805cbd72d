//! Error types for the Ledger.

use ledgerline_core::{CanonicalizationError, CoreError, ValidationError};
use ledgerline_feed::FeedError;
use ledgerline_projection::TransitionConflict;
use ledgerline_topic::PublishError;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Hashing error.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Event encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The topic refused the event or could not be reached.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Mirror error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Override of an application this ledger has not seen created.
    #[error("unknown application: {0}")]
    UnknownApplication(String),

    /// The application's status does not allow the command.
    #[error("application {application_id}: {conflict}")]
    Transition {
        application_id: String,
        #[source]
        conflict: TransitionConflict,
    },
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
