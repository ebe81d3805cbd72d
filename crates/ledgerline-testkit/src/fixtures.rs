//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use ledgerline_core::{
    ChainKey, ConsensusTimestamp, Event, EventBuilder, EventHash, EventKind, LoggedEvent,
    Metrics, TopicId,
};
use ledgerline_topic::MemoryTopic;

/// First client timestamp handed out by a fixture, in milliseconds.
pub const FIXTURE_EPOCH_MS: i64 = 1_700_000_000_000;

/// Builds well-formed events, linking each to the head of its chain.
pub struct ChainFixture {
    heads: BTreeMap<ChainKey, EventHash>,
    clock: i64,
}

impl ChainFixture {
    /// Create a fixture with no chains.
    pub fn new() -> Self {
        Self {
            heads: BTreeMap::new(),
            clock: FIXTURE_EPOCH_MS,
        }
    }

    /// Current head of a chain.
    pub fn head(&self, chain: &ChainKey) -> Option<EventHash> {
        self.heads.get(chain).copied()
    }

    /// Create an `ApplicationCreated` event.
    pub fn application_created(&mut self, application_id: &str, amount: f64) -> Event {
        let builder = EventBuilder::new(EventKind::ApplicationCreated)
            .field("applicationId", application_id)
            .field("amount", amount)
            .field("status", "CREATED");
        self.link(ChainKey::application(application_id), builder)
    }

    /// Create a `DecisionOverridden` event.
    pub fn decision_overridden(&mut self, application_id: &str, reason: &str) -> Event {
        let builder = EventBuilder::new(EventKind::DecisionOverridden)
            .field("applicationId", application_id)
            .field("reason", reason)
            .field("newStatus", "OVERRIDDEN");
        self.link(ChainKey::application(application_id), builder)
    }

    /// Create an `AIVersionRegistered` event.
    pub fn ai_version_registered(&mut self, model_id: &str, version: &str) -> Event {
        let builder = EventBuilder::new(EventKind::AiVersionRegistered)
            .field("modelId", model_id)
            .field("version", version)
            .field("repoUrl", format!("https://git.example.org/ml/{model_id}"))
            .field("artifactHash", format!("sha256:{model_id}-{version}"));
        self.link(ChainKey::model(model_id, version), builder)
    }

    /// Create an `AIVersionEvaluated` event.
    pub fn ai_version_evaluated(
        &mut self,
        model_id: &str,
        version: &str,
        eval_id: &str,
        metrics: &Metrics,
    ) -> Event {
        let builder = EventBuilder::new(EventKind::AiVersionEvaluated)
            .field("modelId", model_id)
            .field("version", version)
            .field("evalId", eval_id)
            .field("dataset", "holdout")
            .field("metrics", json!(metrics))
            .field("passed", true);
        self.link(ChainKey::model(model_id, version), builder)
    }

    /// Create an event of a kind this system does not recognize.
    pub fn unrecognized(&mut self, kind: &str, payload: Value) -> Event {
        let mut builder = EventBuilder::new(EventKind::from_name(kind)).timestamp(self.tick());
        if let Value::Object(map) = payload {
            builder = builder.payload(map);
        }
        builder.build()
    }

    fn link(&mut self, chain: ChainKey, builder: EventBuilder) -> Event {
        let mut builder = builder.timestamp(self.tick());
        if let Some(head) = self.heads.get(&chain) {
            builder = builder.prev(*head);
        }
        let event = builder.build();
        let hash = event
            .compute_hash()
            .expect("fixture events are canonicalizable");
        self.heads.insert(chain, hash);
        event
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1_000;
        self.clock
    }
}

impl Default for ChainFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Assign consecutive consensus timestamps, one second apart, from `start`.
pub fn logged(start: ConsensusTimestamp, events: impl IntoIterator<Item = Event>) -> Vec<LoggedEvent> {
    let mut ts = start;
    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            if i > 0 {
                ts = ConsensusTimestamp::from_seconds(ts.seconds() + 1);
            }
            LoggedEvent::new(ts, event).with_sequence_number(i as u64 + 1)
        })
        .collect()
}

/// A memory topic already holding `events`, in order.
pub fn seeded_topic(topic: &str, events: &[Event]) -> MemoryTopic {
    let memory = MemoryTopic::new(TopicId::new(topic));
    for event in events {
        let wire = event.to_wire().expect("fixture events encode");
        memory.inject_bytes(&wire);
    }
    memory
}
