//! # Ledgerline Topic
//!
//! The write side of a ledger topic.
//!
//! A topic is an append-only, totally ordered message log hosted by the
//! ledger. Publishing is a capability behind the [`Publisher`] trait;
//! [`MemoryTopic`] implements it together with the read side
//! ([`MirrorFeed`](ledgerline_feed::MirrorFeed)) for tests and local runs.
//!
//! ## Design Notes
//!
//! - **Ledger-assigned order**: the consensus timestamp in a
//!   [`SubmitReceipt`] is the only ordering key; producer timestamps are not
//!   trusted.
//! - **No local side effects on failure**: a [`PublishError`] means nothing
//!   was appended.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{PublishError, Result};
pub use memory::{MemoryTopic, GENESIS};
pub use traits::{Publisher, SubmitReceipt};
