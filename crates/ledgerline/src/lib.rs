//! # Ledgerline
//!
//! The unified API for Ledgerline: an audit trail of loan decisions and AI
//! model versions, published as hash-chained events to an ordered ledger
//! topic and read back as projected state.
//!
//! ## Overview
//!
//! - **Events**: immutable records, canonicalized and hashed with SHA-256
//! - **Chains**: per-application and per-model-version sequences linked by `prevHash`
//! - **Topic**: an ordered, append-only log that assigns consensus timestamps
//! - **Feed**: a paginated mirror of the topic, reconciled into a deduplicated log
//! - **Projection**: current state folded from the log, with anomalies recorded
//!
//! ## Key Concepts
//!
//! - **Event**: never edited. A change of state is a new event.
//! - **Consensus timestamp**: the topic's total order. Client timestamps are informational.
//! - **Head**: the hash of the last event in a chain, the next event's `prevHash`.
//! - **Anomaly**: an event that conflicts with current state. It is kept, not applied.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerline::{Ledger, LedgerConfig};
//! use ledgerline::topic::MemoryTopic;
//!
//! async fn example() -> ledgerline::Result<()> {
//!     let config = LedgerConfig::from_env()?;
//!     let topic = Arc::new(MemoryTopic::new(config.topic.clone()));
//!     let ledger = Ledger::from_config(Arc::clone(&topic), &config);
//!
//!     ledger.create_application("A-1001", 25_000.0).await?;
//!     ledger.override_decision("A-1001", "manual underwriting review").await?;
//!
//!     let mut poller = config.http_poller()?;
//!     poller.poll_once().await;
//!     let state = poller.projection();
//!     println!("{:?}", state.status_of("A-1001"));
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `ledgerline::core` - Events, canonical form, hashing, chains
//! - `ledgerline::projection` - State folded from the log
//! - `ledgerline::feed` - Mirror reading, reconciliation, polling
//! - `ledgerline::topic` - Publishing and the in-memory topic

pub mod config;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use ledgerline_core as core;
pub use ledgerline_feed as feed;
pub use ledgerline_projection as projection;
pub use ledgerline_topic as topic;

// Re-export main types for convenience
pub use config::LedgerConfig;
pub use error::{ConfigError, LedgerError, Result};
pub use ledger::{Ledger, Published};

// Re-export commonly used types
pub use ledgerline_core::{
    AiVersionEvaluated, AiVersionRegistered, ChainKey, ConsensusTimestamp, Event, EventHash,
    EventKind, LoggedEvent, Metrics, TopicId,
};
pub use ledgerline_feed::{FeedPoller, PollOutcome};
pub use ledgerline_projection::{ApplicationStatus, Projection, StateConflict};
pub use ledgerline_topic::{MemoryTopic, Publisher, SubmitReceipt};
