//! Scheduled polling of a mirror feed.
//!
//! Each tick runs one fetch, reconcile, project cycle. Cycles never overlap:
//! [`FeedPoller::poll_once`] takes `&mut self`, so the next tick cannot start
//! until the previous round trip has finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use ledgerline_core::{LoggedEvent, ReplayCursor, TopicId};
use ledgerline_projection::Projection;

use crate::error::FeedError;
use crate::mirror::MirrorFeed;
use crate::reconcile::FeedReconciler;

/// Configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between cycles.
    pub interval: Duration,
    /// Messages requested per page.
    pub page_limit: usize,
    /// Pages drained per cycle while pages come back full.
    pub max_pages_per_poll: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(4_000),
            page_limit: 25,
            max_pages_per_poll: 4,
        }
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollOutcome {
    /// Pages fetched successfully.
    pub pages: usize,
    /// Raw messages received.
    pub fetched: usize,
    /// Events added to the log.
    pub new_events: usize,
    /// Messages rejected by the decoder.
    pub rejected: usize,
    /// Messages already seen.
    pub duplicates: usize,
    /// Cursor after the cycle.
    pub cursor: ReplayCursor,
    /// Fetch failure that ended the cycle, if any.
    pub error: Option<FeedError>,
}

/// Owns the reconciler and projection for one topic and keeps them current.
pub struct FeedPoller<F: MirrorFeed> {
    feed: F,
    topic: TopicId,
    config: PollerConfig,
    reconciler: FeedReconciler,
    projection: Arc<Projection>,
    snapshots: watch::Sender<Arc<Projection>>,
}

impl<F: MirrorFeed> FeedPoller<F> {
    /// Create a poller starting from an empty log.
    pub fn new(feed: F, topic: TopicId, config: PollerConfig) -> Self {
        let projection = Arc::new(Projection::new());
        let (snapshots, _) = watch::channel(Arc::clone(&projection));
        Self {
            feed,
            topic,
            config,
            reconciler: FeedReconciler::new(),
            projection,
            snapshots,
        }
    }

    /// Subscribe to projection snapshots, published after every cycle that
    /// added events.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Projection>> {
        self.snapshots.subscribe()
    }

    /// The current projection.
    pub fn projection(&self) -> Arc<Projection> {
        Arc::clone(&self.projection)
    }

    /// The reconciler holding the accumulated log.
    pub fn reconciler(&self) -> &FeedReconciler {
        &self.reconciler
    }

    /// The topic being polled.
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Run one fetch, reconcile, project cycle.
    ///
    /// A failed fetch is logged and ends the cycle; pages reconciled before
    /// it are kept, and the cursor is never moved by the failure.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        let mut added: Vec<LoggedEvent> = Vec::new();
        let limit = self.config.page_limit.max(1);

        for _ in 0..self.config.max_pages_per_poll.max(1) {
            let before = self.reconciler.cursor();
            let page = match self
                .feed
                .fetch_messages(&self.topic, before.position(), limit)
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    tracing::warn!(topic = %self.topic, %error, "mirror fetch failed");
                    outcome.error = Some(error);
                    break;
                }
            };

            let count = page.len();
            outcome.pages += 1;
            outcome.fetched += count;

            let result = self.reconciler.reconcile(page);
            outcome.new_events += result.new_events.len();
            outcome.rejected += result.rejected.len();
            outcome.duplicates += result.duplicates;
            added.extend(result.new_events);

            if count < limit || result.cursor == before {
                break;
            }
        }

        if !added.is_empty() {
            self.project(&added);
            tracing::info!(
                topic = %self.topic,
                added = added.len(),
                total = self.reconciler.len(),
                "feed updated"
            );
        } else if outcome.error.is_none() {
            tracing::debug!(topic = %self.topic, "no new messages");
        }

        outcome.cursor = self.reconciler.cursor();
        outcome
    }

    /// Fold newly added events into the projection and publish a snapshot.
    ///
    /// Events older than something already projected force a full replay so
    /// the projection stays a fold over the ordered log.
    fn project(&mut self, added: &[LoggedEvent]) {
        let mut newest = self.projection.last_applied();
        let mut late = false;
        for logged in added {
            if Some(logged.consensus_timestamp) <= newest {
                late = true;
            }
            newest = newest.max(Some(logged.consensus_timestamp));
        }

        let next = if late {
            tracing::debug!(topic = %self.topic, "late event, replaying log");
            Projection::replay(self.reconciler.log())
        } else {
            added
                .iter()
                .fold((*self.projection).clone(), |state, logged| state.apply(logged))
        };

        self.projection = Arc::new(next);
        self.snapshots.send_replace(Arc::clone(&self.projection));
    }

    /// Poll on a fixed interval until `shutdown` becomes true.
    ///
    /// The first cycle runs immediately. Ticks missed while a cycle is slow
    /// are skipped, not queued.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(topic = %self.topic, interval = ?self.config.interval, "poller started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(topic = %self.topic, "poller stopped");
        self
    }
}
