//! # Ledgerline Feed
//!
//! Reading a topic back from a mirror and turning it into ordered events.
//!
//! ## Overview
//!
//! A mirror serves topic messages paginated, at least once, with no ordering
//! guarantee across retries. This crate decodes those messages, merges them
//! into a deduplicated log ordered by consensus timestamp, and keeps a
//! [`Projection`](ledgerline_projection::Projection) of that log current.
//!
//! ## Key Properties
//!
//! - **Idempotent**: redelivered messages are recognized by consensus timestamp
//! - **Tolerant**: one undecodable message never aborts a batch
//! - **Monotonic**: the replay cursor never moves backwards
//! - **Non-overlapping**: one poll cycle at a time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledgerline_core::TopicId;
//! use ledgerline_feed::{FeedPoller, HttpMirrorFeed, MirrorConfig, PollerConfig};
//!
//! async fn example() -> ledgerline_feed::Result<()> {
//!     let feed = HttpMirrorFeed::new(MirrorConfig::default())?;
//!     let poller = FeedPoller::new(feed, TopicId::new("0.0.4512"), PollerConfig::default());
//!     let mut snapshots = poller.subscribe();
//!
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!     tokio::spawn(poller.run(shutdown));
//!
//!     while snapshots.changed().await.is_ok() {
//!         let state = snapshots.borrow().clone();
//!         println!("{} applications", state.applications().count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! MirrorFeed --RawMessage--> decode --LoggedEvent--> FeedReconciler --new events--> Projection
//!                              |                          |
//!                         DecodeError               ReplayCursor
//! ```

pub mod error;
pub mod messages;
pub mod mirror;
pub mod poller;
pub mod reconcile;

pub use error::{DecodeError, FeedError, Result};
pub use messages::{Links, MirrorPage, RawMessage};
pub use mirror::http::{HttpMirrorFeed, MirrorConfig, DEFAULT_MIRROR_URL};
pub use mirror::MirrorFeed;
pub use poller::{FeedPoller, PollOutcome, PollerConfig};
pub use reconcile::{FeedReconciler, Reconciliation, RejectedMessage};
