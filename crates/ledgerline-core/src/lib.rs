//! # Ledgerline Core
//!
//! Pure primitives for Ledgerline: domain events, canonicalization, hashing
//! and hash-chain validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the event model shared by producers and verifiers.
//!
//! ## Key Types
//!
//! - [`Event`] - An immutable domain event as published to a topic
//! - [`EventKind`] - Discriminator for payload interpretation
//! - [`EventHash`] - Tagged SHA-256 digest of an event (`sha256:<hex>`)
//! - [`LoggedEvent`] - An event paired with its ledger-assigned [`ConsensusTimestamp`]
//! - [`ChainKey`] - The per-entity chain an event belongs to
//!
//! ## Canonicalization
//!
//! Event hashes are computed over a sorted-key, recursively canonical JSON
//! rendering. See [`canonical`] module.

pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod event;
pub mod types;
pub mod validation;

pub use canonical::{canonicalize, canonicalize_serializable, MAX_DEPTH};
pub use chain::{group_by_chain, validate_chain, verify_chains, ChainKey, ChainVerification};
pub use crypto::{EventHash, HashAlgorithm};
pub use error::{CanonicalizationError, ChainBreak, CoreError, HashParseError, ValidationError};
pub use event::{
    AiVersionEvaluated, AiVersionRegistered, ApplicationCreated, DecisionOverridden, Event,
    EventBuilder, EventKind, EventPayload, LoggedEvent, Metrics,
};
pub use types::{ConsensusTimestamp, ParseTimestampError, ReplayCursor, TopicId};
pub use validation::validate_event;
