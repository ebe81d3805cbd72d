//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use ledgerline_core::{ConsensusTimestamp, Event, EventBuilder, EventKind, LoggedEvent};

use crate::fixtures::ChainFixture;

/// Generate an identifier such as an application or model id.
pub fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a reasonable client timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Generate a consensus timestamp.
pub fn consensus_timestamp() -> impl Strategy<Value = ConsensusTimestamp> {
    (0u64..=4_102_444_800, 0u32..1_000_000_000).prop_map(|(s, n)| {
        ConsensusTimestamp::new(s, n).unwrap_or(ConsensusTimestamp::from_seconds(s))
    })
}

/// Generate an event kind, including unrecognized ones.
pub fn event_kind() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::ApplicationCreated),
        Just(EventKind::DecisionOverridden),
        Just(EventKind::AiVersionRegistered),
        Just(EventKind::AiVersionEvaluated),
        "[A-Z][A-Za-z]{2,12}".prop_map(|name| EventKind::from_name(&name)),
    ]
}

/// Generate a JSON leaf value.
///
/// Floats are quarters, so their decimal form parses back exactly.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-4_000_000i64..4_000_000).prop_map(|n| Value::from(n as f64 / 4.0)),
        ".{0,12}".prop_map(Value::String),
    ]
}

/// Generate an arbitrary JSON value of bounded depth and size.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(".{0,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Parameters for generating an event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub kind: EventKind,
    pub timestamp: i64,
    pub payload: Map<String, Value>,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            event_kind(),
            timestamp(),
            prop::collection::btree_map("[a-zA-Z]{1,10}", json_value(), 0..8),
        )
            .prop_map(|(kind, timestamp, payload)| EventParams {
                kind,
                timestamp,
                payload: payload.into_iter().collect(),
            })
            .boxed()
    }
}

impl EventParams {
    /// Build the event these parameters describe.
    pub fn build(&self) -> Event {
        EventBuilder::new(self.kind.clone())
            .timestamp(self.timestamp)
            .payload(self.payload.clone())
            .build()
    }
}

/// Generate a well-formed `ApplicationCreated` event.
pub fn application_event() -> impl Strategy<Value = Event> {
    (identifier(), 0.0f64..1.0e7, timestamp()).prop_map(|(id, amount, ts)| {
        EventBuilder::new(EventKind::ApplicationCreated)
            .timestamp(ts)
            .field("applicationId", id)
            .field("amount", amount)
            .build()
    })
}

#[derive(Debug, Clone)]
enum Step {
    Create(usize, f64),
    Override(usize),
    Register(usize),
    Evaluate(usize, f64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0usize..4, 1.0f64..1.0e6).prop_map(|(i, a)| Step::Create(i, a)),
        (0usize..4).prop_map(Step::Override),
        (0usize..3).prop_map(Step::Register),
        (0usize..3, 0.0f64..1.0).prop_map(|(i, m)| Step::Evaluate(i, m)),
    ]
}

/// Generate a log of chained domain events in consensus order.
///
/// Steps are drawn without regard to state, so logs contain orphaned
/// overrides, double overrides and evaluations of unregistered versions.
pub fn logged_events(max: usize) -> impl Strategy<Value = Vec<LoggedEvent>> {
    (prop::collection::vec(step(), 0..=max), consensus_timestamp()).prop_map(|(steps, start)| {
        let mut fixture = ChainFixture::new();
        let events = steps.into_iter().enumerate().map(|(n, step)| match step {
            Step::Create(i, amount) => fixture.application_created(&format!("A-{i}"), amount),
            Step::Override(i) => {
                fixture.decision_overridden(&format!("A-{i}"), &format!("reason {n}"))
            }
            Step::Register(i) => fixture.ai_version_registered("model", &i.to_string()),
            Step::Evaluate(i, auc) => fixture.ai_version_evaluated(
                "model",
                &i.to_string(),
                &format!("eval-{n}"),
                &[("auc".to_string(), auc)].into(),
            ),
        });
        let events: Vec<Event> = events.collect();
        crate::fixtures::logged(start, events)
    })
}

/// A payload that is valid JSON but not an event.
pub fn non_event_json() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        json_leaf().prop_map(|v| v.to_string().into_bytes()),
        Just(json!([1, 2, 3]).to_string().into_bytes()),
        Just(json!({ "payload": {} }).to_string().into_bytes()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::{canonicalize, verify_chains};

    proptest! {
        #[test]
        fn test_hash_deterministic(params: EventParams) {
            let e1 = params.build();
            let e2 = params.build();
            prop_assert_eq!(e1.compute_hash().unwrap(), e2.compute_hash().unwrap());
        }

        #[test]
        fn test_wire_preserves_hash(params: EventParams) {
            let event = params.build();
            let decoded = Event::from_wire(&event.to_wire().unwrap()).unwrap();
            prop_assert_eq!(decoded.compute_hash().unwrap(), event.compute_hash().unwrap());
        }

        #[test]
        fn test_canonical_output_reparses(value in json_value()) {
            let canonical = canonicalize(&value).unwrap();
            let reparsed: Value = serde_json::from_str(&canonical).unwrap();
            prop_assert_eq!(canonicalize(&reparsed).unwrap(), canonical);
        }

        #[test]
        fn test_generated_logs_are_chained(log in logged_events(24)) {
            for window in log.windows(2) {
                prop_assert!(window[0].consensus_timestamp < window[1].consensus_timestamp);
            }
            for verification in verify_chains(&log).unwrap().values() {
                prop_assert!(verification.is_valid());
            }
        }

        #[test]
        fn test_non_event_json_rejected(bytes in non_event_json()) {
            prop_assert!(Event::from_wire(&bytes).is_err());
        }
    }
}
