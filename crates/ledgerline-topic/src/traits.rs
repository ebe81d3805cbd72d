//! Publisher trait: the abstract interface for appending events to a topic.
//!
//! Implementations include a ledger client and an in-memory topic (for tests).

use async_trait::async_trait;
use std::sync::Arc;

use ledgerline_core::{ConsensusTimestamp, Event, TopicId};

use crate::error::Result;

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Position of the message in the topic, starting at 1.
    pub sequence_number: u64,
    /// Ledger-assigned ordering key.
    pub consensus_timestamp: ConsensusTimestamp,
}

/// Write access to a topic.
///
/// # Design Notes
///
/// - **Awaited**: `submit` resolves only once the ledger has accepted or
///   refused the event; there is no client-side queue.
/// - **Opaque events**: the publisher does not validate or re-hash; the
///   event is published exactly as given.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Submit an event to a topic.
    async fn submit(&self, topic: &TopicId, event: &Event) -> Result<SubmitReceipt>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn submit(&self, topic: &TopicId, event: &Event) -> Result<SubmitReceipt> {
        (**self).submit(topic, event).await
    }
}
