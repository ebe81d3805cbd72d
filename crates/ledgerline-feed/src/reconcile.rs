//! Feed reconciliation.
//!
//! Merges pages of raw mirror messages into a deduplicated log ordered by
//! consensus timestamp, tracking the replay cursor.
//!
//! ## Properties
//!
//! - **Idempotent**: feeding the same batch twice yields nothing new
//! - **Order-insensitive**: the log depends only on the set of messages seen
//! - **Monotonic**: the cursor never moves backwards

use std::collections::{BTreeMap, BTreeSet};

use ledgerline_core::{ConsensusTimestamp, LoggedEvent, ReplayCursor};

use crate::error::DecodeError;
use crate::messages::RawMessage;

/// A message that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedMessage {
    /// The consensus timestamp as served.
    pub consensus_timestamp: String,
    /// Why decoding failed.
    pub error: DecodeError,
}

/// Outcome of reconciling one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Net-new events, ascending by consensus timestamp.
    pub new_events: Vec<LoggedEvent>,
    /// Cursor after this batch.
    pub cursor: ReplayCursor,
    /// Messages rejected for the first time in this batch.
    pub rejected: Vec<RejectedMessage>,
    /// Messages already seen (in the log, earlier in the batch, or rejected before).
    pub duplicates: usize,
}

impl Reconciliation {
    /// Check if the batch contributed nothing.
    pub fn is_empty(&self) -> bool {
        self.new_events.is_empty() && self.rejected.is_empty()
    }
}

/// Accumulates the ordered event log and replay cursor.
#[derive(Debug, Clone, Default)]
pub struct FeedReconciler {
    log: BTreeMap<ConsensusTimestamp, LoggedEvent>,
    rejected: BTreeSet<ConsensusTimestamp>,
    cursor: ReplayCursor,
}

impl FeedReconciler {
    /// Create an empty reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current replay cursor.
    pub fn cursor(&self) -> ReplayCursor {
        self.cursor
    }

    /// The accumulated log, ascending by consensus timestamp.
    pub fn log(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.log.values()
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Check if a consensus timestamp has already been seen.
    pub fn contains(&self, ts: &ConsensusTimestamp) -> bool {
        self.log.contains_key(ts) || self.rejected.contains(ts)
    }

    /// Merge a batch of raw messages.
    ///
    /// Each message is decoded independently; failures are reported in
    /// [`Reconciliation::rejected`] and never abort the batch. Only events not
    /// already in the log are returned. The cursor moves to the newest
    /// consensus timestamp the batch carried, decodable or not, so that a
    /// poison message cannot stall the feed.
    pub fn reconcile<I>(&mut self, batch: I) -> Reconciliation
    where
        I: IntoIterator<Item = RawMessage>,
    {
        let mut fresh: BTreeMap<ConsensusTimestamp, LoggedEvent> = BTreeMap::new();
        let mut rejected = Vec::new();
        let mut duplicates = 0;

        for raw in batch {
            if let Ok(ts) = raw.consensus() {
                if self.contains(&ts) || fresh.contains_key(&ts) {
                    duplicates += 1;
                    continue;
                }
            }

            match raw.decode() {
                Ok(logged) => {
                    fresh.insert(logged.consensus_timestamp, logged);
                }
                Err(error) => {
                    tracing::warn!(
                        consensus_timestamp = %raw.consensus_timestamp,
                        %error,
                        "skipping undecodable message"
                    );
                    if let Ok(ts) = raw.consensus() {
                        self.rejected.insert(ts);
                        self.cursor.advance(ts);
                    }
                    rejected.push(RejectedMessage {
                        consensus_timestamp: raw.consensus_timestamp,
                        error,
                    });
                }
            }
        }

        let mut new_events = Vec::with_capacity(fresh.len());
        for (ts, logged) in fresh {
            self.cursor.advance(ts);
            self.log.insert(ts, logged.clone());
            new_events.push(logged);
        }

        if !new_events.is_empty() || !rejected.is_empty() {
            tracing::debug!(
                new = new_events.len(),
                rejected = rejected.len(),
                duplicates,
                cursor = ?self.cursor.position(),
                "batch reconciled"
            );
        }

        Reconciliation {
            new_events,
            cursor: self.cursor,
            rejected,
            duplicates,
        }
    }
}
