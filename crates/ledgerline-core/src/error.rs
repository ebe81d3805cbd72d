//! Error types for Ledgerline Core.

use thiserror::Error;

use crate::crypto::EventHash;

/// Errors raised while producing a canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    #[error("value nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("value is not serializable: {0}")]
    Unserializable(String),
}

/// Malformed event shape, rejected before hashing or publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind}: missing required field `{field}`")]
    MissingField { kind: String, field: &'static str },

    #[error("{kind}: field `{field}` {reason}")]
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },

    #[error("metrics must be a flat mapping of name to number: {0}")]
    InvalidMetrics(String),

    #[error("event must be a JSON object")]
    NotAnObject,

    #[error("event has no `type`")]
    MissingType,
}

/// A hash-chain link whose stated `prevHash` does not match the recomputed
/// hash of its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain broken at index {index}: expected prevHash {expected}, found {}", describe(.found))]
pub struct ChainBreak {
    /// Position of the offending event in the inspected sequence.
    pub index: usize,
    /// Hash of the predecessor, as recomputed.
    pub expected: EventHash,
    /// The `prevHash` the event actually carried.
    pub found: Option<EventHash>,
}

fn describe(found: &Option<EventHash>) -> String {
    match found {
        Some(hash) => hash.to_string(),
        None => "none".to_string(),
    }
}

/// Failure to parse a tagged digest string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashParseError {
    #[error("missing algorithm tag in {0:?}")]
    MissingTag(String),

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid digest hex: {0}")]
    InvalidHex(String),
}

/// Core errors that can occur while building or hashing events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            CoreError::DecodingError(e.to_string())
        } else {
            CoreError::EncodingError(e.to_string())
        }
    }
}
