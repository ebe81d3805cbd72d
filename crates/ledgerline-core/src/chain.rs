//! Hash-chain validation.
//!
//! Each event names its logical predecessor by `prevHash`. A chain is the
//! sequence of events belonging to one entity: a loan application, or one
//! version of an AI model.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CanonicalizationError, ChainBreak};
use crate::event::{Event, EventKind, LoggedEvent};

/// The entity chain an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainKey {
    /// Loan application lifecycle, keyed by application ID.
    Application(String),
    /// AI model version lifecycle, keyed by (model ID, version).
    Model { model_id: String, version: String },
}

impl ChainKey {
    /// Determine the chain of an event.
    ///
    /// Returns `None` for unrecognized kinds and for events missing the
    /// identifying fields.
    pub fn of(event: &Event) -> Option<Self> {
        match event.kind {
            EventKind::ApplicationCreated | EventKind::DecisionOverridden => event
                .payload_str("applicationId")
                .map(|id| ChainKey::Application(id.to_string())),
            EventKind::AiVersionRegistered | EventKind::AiVersionEvaluated => {
                let model_id = event.payload_str("modelId")?;
                let version = event.payload_str("version")?;
                Some(ChainKey::Model {
                    model_id: model_id.to_string(),
                    version: version.to_string(),
                })
            }
            EventKind::Other(_) => None,
        }
    }

    /// Chain key for an application.
    pub fn application(id: impl Into<String>) -> Self {
        ChainKey::Application(id.into())
    }

    /// Chain key for a model version.
    pub fn model(model_id: impl Into<String>, version: impl Into<String>) -> Self {
        ChainKey::Model {
            model_id: model_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKey::Application(id) => write!(f, "application:{id}"),
            ChainKey::Model { model_id, version } => write!(f, "model:{model_id}@{version}"),
        }
    }
}

/// Result of validating one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    checked: usize,
    broken: Option<ChainBreak>,
}

impl ChainVerification {
    /// Check if every inspected link matched.
    pub fn is_valid(&self) -> bool {
        self.broken.is_none()
    }

    /// Index of the first event whose `prevHash` did not match.
    pub fn broken_at(&self) -> Option<usize> {
        self.broken.as_ref().map(|b| b.index)
    }

    /// Details of the first break, if any.
    pub fn chain_break(&self) -> Option<&ChainBreak> {
        self.broken.as_ref()
    }

    /// Number of events inspected before stopping.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Convert into a `Result`, mapping a break to its error.
    pub fn into_result(self) -> Result<(), ChainBreak> {
        match self.broken {
            None => Ok(()),
            Some(b) => Err(b),
        }
    }
}

/// Validate events given in chain order.
///
/// For each event after the first, the hash of its predecessor is recomputed
/// and compared with the event's `prevHash`. Validation stops at the first
/// mismatch. A head that carries a `prevHash` is accepted, its predecessor
/// may lie outside the inspected sequence.
pub fn validate_chain<E: AsRef<Event>>(
    events: &[E],
) -> Result<ChainVerification, CanonicalizationError> {
    let mut checked = 0;
    let mut previous: Option<&Event> = None;

    for (index, event) in events.iter().enumerate() {
        let event = event.as_ref();
        checked += 1;

        if let Some(prev) = previous {
            let expected = prev.compute_hash()?;
            if event.prev_hash != Some(expected) {
                return Ok(ChainVerification {
                    checked,
                    broken: Some(ChainBreak {
                        index,
                        expected,
                        found: event.prev_hash,
                    }),
                });
            }
        }

        previous = Some(event);
    }

    Ok(ChainVerification {
        checked,
        broken: None,
    })
}

/// Split a consensus-ordered log into per-entity chains, preserving order.
///
/// Events without a chain (unrecognized kinds) are left out.
pub fn group_by_chain(events: &[LoggedEvent]) -> BTreeMap<ChainKey, Vec<&LoggedEvent>> {
    let mut chains: BTreeMap<ChainKey, Vec<&LoggedEvent>> = BTreeMap::new();
    for logged in events {
        if let Some(key) = ChainKey::of(&logged.event) {
            chains.entry(key).or_default().push(logged);
        }
    }
    chains
}

/// Validate every chain in a consensus-ordered log.
pub fn verify_chains(
    events: &[LoggedEvent],
) -> Result<BTreeMap<ChainKey, ChainVerification>, CanonicalizationError> {
    group_by_chain(events)
        .into_iter()
        .map(|(key, chain)| Ok((key, validate_chain(&chain)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EventHash;
    use crate::event::EventBuilder;
    use crate::types::ConsensusTimestamp;

    fn created(id: &str) -> Event {
        EventBuilder::new(EventKind::ApplicationCreated)
            .timestamp(1)
            .field("applicationId", id)
            .field("amount", 500)
            .build()
    }

    fn overridden(id: &str, prev: &Event) -> Event {
        EventBuilder::new(EventKind::DecisionOverridden)
            .timestamp(2)
            .field("applicationId", id)
            .field("reason", "manual review")
            .prev(prev.link_next().unwrap())
            .build()
    }

    fn registered(model: &str, version: &str) -> Event {
        EventBuilder::new(EventKind::AiVersionRegistered)
            .timestamp(3)
            .field("modelId", model)
            .field("version", version)
            .field("repoUrl", "https://example.org/repo")
            .field("artifactHash", "abc")
            .build()
    }

    fn logged(secs: u64, event: Event) -> LoggedEvent {
        LoggedEvent::new(ConsensusTimestamp::new(secs, 0).unwrap(), event)
    }

    #[test]
    fn test_empty_and_single_are_valid() {
        let empty: Vec<Event> = vec![];
        assert!(validate_chain(&empty).unwrap().is_valid());
        assert!(validate_chain(&[created("A1")]).unwrap().is_valid());
    }

    #[test]
    fn test_linked_chain_valid() {
        let head = created("A1");
        let next = overridden("A1", &head);
        let result = validate_chain(&[head, next]).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.checked(), 2);
        assert_eq!(result.into_result(), Ok(()));
    }

    #[test]
    fn test_tampered_predecessor_breaks_chain() {
        let head = created("A1");
        let next = overridden("A1", &head);
        let mut tampered = head.clone();
        tampered
            .payload
            .insert("amount".into(), serde_json::json!(501));

        let result = validate_chain(&[tampered.clone(), next.clone()]).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.broken_at(), Some(1));

        let err = result.into_result().unwrap_err();
        assert_eq!(err.expected, tampered.compute_hash().unwrap());
        assert_eq!(err.found, next.prev_hash);
    }

    #[test]
    fn test_missing_prev_hash_after_head_is_break() {
        let mut next = overridden("A1", &created("A1"));
        next.prev_hash = None;
        let result = validate_chain(&[created("A1"), next]).unwrap();
        assert_eq!(result.broken_at(), Some(1));
        assert_eq!(result.chain_break().unwrap().found, None);
    }

    #[test]
    fn test_stops_at_first_break() {
        let head = created("A1");
        let bad = created("A1").with_prev_hash(EventHash::sha256(b"wrong"));
        let result = validate_chain(&[head, bad.clone(), bad]).unwrap();
        assert_eq!(result.broken_at(), Some(1));
        assert_eq!(result.checked(), 2);
    }

    #[test]
    fn test_head_with_prev_hash_accepted() {
        let orphan = created("A1").with_prev_hash(EventHash::sha256(b"outside"));
        assert!(validate_chain(&[orphan]).unwrap().is_valid());
    }

    #[test]
    fn test_chain_key_of() {
        assert_eq!(ChainKey::of(&created("A1")), Some(ChainKey::application("A1")));
        assert_eq!(
            ChainKey::of(&registered("m", "2")),
            Some(ChainKey::model("m", "2"))
        );
        let other = EventBuilder::new(EventKind::Other("X".into()))
            .field("applicationId", "A1")
            .build();
        assert_eq!(ChainKey::of(&other), None);
        assert_eq!(ChainKey::model("m", "2").to_string(), "model:m@2");
    }

    #[test]
    fn test_group_and_verify_interleaved_chains() {
        let a1 = created("A1");
        let b1 = created("B1");
        let a2 = overridden("A1", &a1);
        let m1 = registered("m", "1");
        let log = vec![
            logged(1, a1),
            logged(2, b1),
            logged(3, m1),
            logged(4, a2),
            logged(5, EventBuilder::new(EventKind::Other("Noise".into())).build()),
        ];

        let groups = group_by_chain(&log);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&ChainKey::application("A1")].len(), 2);

        let verified = verify_chains(&log).unwrap();
        assert!(verified.values().all(ChainVerification::is_valid));
    }

    #[test]
    fn test_verify_chains_reports_broken_entity() {
        let a1 = created("A1");
        let mut a2 = overridden("A1", &a1);
        a2.prev_hash = Some(EventHash::sha256(b"forged"));
        let log = vec![logged(1, a1), logged(2, created("B1")), logged(3, a2)];

        let verified = verify_chains(&log).unwrap();
        assert_eq!(verified[&ChainKey::application("A1")].broken_at(), Some(1));
        assert!(verified[&ChainKey::application("B1")].is_valid());
    }
}
