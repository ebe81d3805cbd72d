//! In-memory topic.
//!
//! Implements both [`Publisher`] and [`MirrorFeed`] over one ordered message
//! list, assigning strictly increasing consensus timestamps and sequence
//! numbers. Knobs simulate the failure modes of a real ledger and mirror:
//! refused submissions, failing fetches, undecodable messages, redelivery and
//! out-of-order pages.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use ledgerline_core::{ConsensusTimestamp, Event, LoggedEvent, TopicId};
use ledgerline_feed::{FeedError, MirrorFeed, RawMessage};

use crate::error::{PublishError, Result};
use crate::traits::{Publisher, SubmitReceipt};

/// First consensus timestamp handed out by a new topic.
pub const GENESIS: ConsensusTimestamp = ConsensusTimestamp::from_seconds(1_700_000_000);

/// Spacing between consecutive consensus timestamps.
const STEP_NANOS: u64 = 1_000_001;

/// In-memory topic.
///
/// All data is lost when the topic is dropped. Thread-safe via RwLock.
pub struct MemoryTopic {
    topic: TopicId,
    inner: RwLock<MemoryTopicInner>,
}

struct MemoryTopicInner {
    /// Messages by consensus timestamp.
    messages: BTreeMap<ConsensusTimestamp, RawMessage>,

    /// Injected messages whose timestamp does not parse; served once.
    unreadable: Vec<RawMessage>,

    /// Last consensus timestamp assigned.
    clock: ConsensusTimestamp,

    /// Last sequence number assigned.
    sequence: u64,

    /// Refuse every submission with this error.
    reject_all: Option<PublishError>,

    /// Refuse the next N submissions.
    reject_next: usize,

    /// Fail the next N fetches.
    fail_fetches: usize,

    /// Re-serve this many already-delivered messages in front of each page.
    redeliver: usize,

    /// Shuffle each page.
    shuffle: Option<StdRng>,
}

impl MemoryTopic {
    /// Create an empty topic.
    pub fn new(topic: TopicId) -> Self {
        Self {
            topic,
            inner: RwLock::new(MemoryTopicInner {
                messages: BTreeMap::new(),
                unreadable: Vec::new(),
                clock: GENESIS,
                sequence: 0,
                reject_all: None,
                reject_next: 0,
                fail_fetches: 0,
                redeliver: 0,
                shuffle: None,
            }),
        }
    }

    /// The topic this instance serves.
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryTopicInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryTopicInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse every submission with `error` (or stop refusing with `None`).
    pub fn reject_all(&self, error: Option<PublishError>) {
        self.write().reject_all = error;
    }

    /// Refuse the next `n` submissions.
    pub fn reject_next(&self, n: usize) {
        self.write().reject_next = n;
    }

    /// Fail the next `n` fetches.
    pub fn fail_next_fetches(&self, n: usize) {
        self.write().fail_fetches = n;
    }

    /// Re-serve up to `n` already-delivered messages in front of every page.
    pub fn redeliver(&self, n: usize) {
        self.write().redeliver = n;
    }

    /// Shuffle every page with a seeded generator.
    pub fn shuffle_pages(&self, seed: u64) {
        self.write().shuffle = Some(StdRng::seed_from_u64(seed));
    }

    /// Append arbitrary bytes as the next message, bypassing the publisher.
    ///
    /// Returns the consensus timestamp assigned.
    pub fn inject_bytes(&self, payload: &[u8]) -> ConsensusTimestamp {
        let mut inner = self.write();
        let (ts, _) = inner.advance();
        inner.messages.insert(ts, RawMessage::from_bytes(ts, payload));
        ts
    }

    /// Insert a raw message as served by a mirror.
    ///
    /// Messages with an unreadable timestamp are served once by the next fetch.
    pub fn inject_raw(&self, message: RawMessage) {
        let mut inner = self.write();
        match message.consensus() {
            Ok(ts) => {
                inner.clock = inner.clock.max(ts);
                inner.messages.insert(ts, message);
            }
            Err(_) => inner.unreadable.push(message),
        }
    }

    /// Number of messages in the topic.
    pub fn len(&self) -> usize {
        self.read().messages.len()
    }

    /// Check if the topic is empty.
    pub fn is_empty(&self) -> bool {
        self.read().messages.is_empty()
    }

    /// Decode every readable message, in consensus order.
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.read()
            .messages
            .values()
            .filter_map(|raw| raw.decode().ok())
            .collect()
    }
}

impl MemoryTopicInner {
    fn advance(&mut self) -> (ConsensusTimestamp, u64) {
        self.clock = step(self.clock);
        self.sequence += 1;
        (self.clock, self.sequence)
    }

    fn take_rejection(&mut self) -> Option<PublishError> {
        if let Some(error) = &self.reject_all {
            return Some(error.clone());
        }
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return Some(PublishError::Rejected("submission refused".into()));
        }
        None
    }
}

fn step(ts: ConsensusTimestamp) -> ConsensusTimestamp {
    let total = u64::from(ts.nanos()) + STEP_NANOS;
    let seconds = ts.seconds() + total / 1_000_000_000;
    let nanos = (total % 1_000_000_000) as u32;
    ConsensusTimestamp::new(seconds, nanos).unwrap_or_else(|| ts.successor())
}

#[async_trait]
impl Publisher for MemoryTopic {
    async fn submit(&self, topic: &TopicId, event: &Event) -> Result<SubmitReceipt> {
        if *topic != self.topic {
            return Err(PublishError::Rejected(format!("unknown topic {topic}")));
        }

        let mut inner = self.write();
        if let Some(error) = inner.take_rejection() {
            tracing::debug!(%topic, %error, "refusing submission");
            return Err(error);
        }

        let wire = event
            .to_wire()
            .map_err(|e| PublishError::Encoding(e.to_string()))?;
        let (consensus_timestamp, sequence_number) = inner.advance();
        let mut raw = RawMessage::from_bytes(consensus_timestamp, &wire);
        raw.sequence_number = Some(sequence_number);
        inner.messages.insert(consensus_timestamp, raw);

        Ok(SubmitReceipt {
            sequence_number,
            consensus_timestamp,
        })
    }
}

#[async_trait]
impl MirrorFeed for MemoryTopic {
    async fn fetch_messages(
        &self,
        topic: &TopicId,
        since: Option<ConsensusTimestamp>,
        limit: usize,
    ) -> std::result::Result<Vec<RawMessage>, FeedError> {
        if *topic != self.topic {
            return Err(FeedError::Status { status: 404 });
        }

        let mut inner = self.write();
        if inner.fail_fetches > 0 {
            inner.fail_fetches -= 1;
            return Err(FeedError::Unavailable("simulated outage".into()));
        }

        let mut page: Vec<RawMessage> = std::mem::take(&mut inner.unreadable);
        let redeliver = inner.redeliver;

        if let Some(since) = since {
            let stale: Vec<RawMessage> = inner
                .messages
                .range(..=since)
                .rev()
                .take(redeliver)
                .map(|(_, raw)| raw.clone())
                .collect();
            page.extend(stale.into_iter().rev());
        }

        let fresh = inner
            .messages
            .iter()
            .filter(|(ts, _)| since.map_or(true, |since| **ts > since))
            .take(limit)
            .map(|(_, raw)| raw.clone());
        page.extend(fresh);

        if let Some(rng) = inner.shuffle.as_mut() {
            page.shuffle(rng);
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::{EventBuilder, EventKind};
    use ledgerline_feed::FeedReconciler;

    fn topic_id() -> TopicId {
        TopicId::new("0.0.42")
    }

    fn event(n: i64) -> Event {
        EventBuilder::new(EventKind::ApplicationCreated)
            .timestamp(n)
            .field("applicationId", format!("A{n}"))
            .field("amount", 100)
            .build()
    }

    #[tokio::test]
    async fn test_submit_assigns_increasing_positions() {
        let topic = MemoryTopic::new(topic_id());
        let first = topic.submit(&topic_id(), &event(1)).await.unwrap();
        let second = topic.submit(&topic_id(), &event(2)).await.unwrap();
        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);
        assert!(second.consensus_timestamp > first.consensus_timestamp);
        assert!(first.consensus_timestamp > GENESIS);
        assert_eq!(topic.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_roundtrips_events() {
        let topic = MemoryTopic::new(topic_id());
        topic.submit(&topic_id(), &event(1)).await.unwrap();
        let page = topic.fetch_messages(&topic_id(), None, 10).await.unwrap();
        let logged = page[0].decode().unwrap();
        assert_eq!(logged.event, event(1));
        assert_eq!(logged.sequence_number, Some(1));
    }

    #[tokio::test]
    async fn test_fetch_respects_cursor_and_limit() {
        let topic = MemoryTopic::new(topic_id());
        let mut receipts = Vec::new();
        for n in 0..5 {
            receipts.push(topic.submit(&topic_id(), &event(n)).await.unwrap());
        }
        let page = topic
            .fetch_messages(&topic_id(), Some(receipts[1].consensus_timestamp), 2)
            .await
            .unwrap();
        let seqs: Vec<_> = page.iter().map(|m| m.sequence_number.unwrap()).collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_rejections() {
        let topic = MemoryTopic::new(topic_id());
        topic.reject_next(1);
        assert!(matches!(
            topic.submit(&topic_id(), &event(1)).await,
            Err(PublishError::Rejected(_))
        ));
        assert!(topic.submit(&topic_id(), &event(1)).await.is_ok());

        topic.reject_all(Some(PublishError::Unauthorized("operator key".into())));
        assert_eq!(
            topic.submit(&topic_id(), &event(2)).await,
            Err(PublishError::Unauthorized("operator key".into()))
        );
        assert_eq!(topic.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_topic() {
        let topic = MemoryTopic::new(topic_id());
        let other = TopicId::new("0.0.99");
        assert!(topic.submit(&other, &event(1)).await.is_err());
        assert_eq!(
            topic.fetch_messages(&other, None, 1).await,
            Err(FeedError::Status { status: 404 })
        );
    }

    #[tokio::test]
    async fn test_fetch_failures_then_recovery() {
        let topic = MemoryTopic::new(topic_id());
        topic.fail_next_fetches(2);
        assert!(topic.fetch_messages(&topic_id(), None, 1).await.is_err());
        assert!(topic.fetch_messages(&topic_id(), None, 1).await.is_err());
        assert!(topic.fetch_messages(&topic_id(), None, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_redelivery_and_shuffle_converge() {
        let topic = MemoryTopic::new(topic_id());
        for n in 0..10 {
            topic.submit(&topic_id(), &event(n)).await.unwrap();
        }
        topic.redeliver(3);
        topic.shuffle_pages(7);

        let mut reconciler = FeedReconciler::new();
        for _ in 0..10 {
            let since = reconciler.cursor().position();
            let page = topic.fetch_messages(&topic_id(), since, 4).await.unwrap();
            reconciler.reconcile(page);
        }

        assert_eq!(reconciler.len(), 10);
        let ordered: Vec<_> = reconciler.log().map(|l| l.event.timestamp).collect();
        assert_eq!(ordered, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unreadable_injections_served_once() {
        let topic = MemoryTopic::new(topic_id());
        topic.inject_raw(RawMessage {
            consensus_timestamp: "garbage".into(),
            message: String::new(),
            sequence_number: None,
        });
        assert_eq!(topic.fetch_messages(&topic_id(), None, 5).await.unwrap().len(), 1);
        assert!(topic.fetch_messages(&topic_id(), None, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inject_bytes_is_ordered_with_submissions() {
        let topic = MemoryTopic::new(topic_id());
        topic.submit(&topic_id(), &event(1)).await.unwrap();
        let poison = topic.inject_bytes(b"\xff");
        let after = topic.submit(&topic_id(), &event(2)).await.unwrap();
        assert!(after.consensus_timestamp > poison);
        assert_eq!(topic.events().len(), 2);
    }
}
