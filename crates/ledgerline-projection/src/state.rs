//! Projected state.
//!
//! The projection is a pure fold over the consensus-ordered log: the same
//! log always yields the same state. It is never mutated from outside; a new
//! value is produced for every applied event.

use std::collections::BTreeMap;

use ledgerline_core::{
    AiVersionEvaluated, AiVersionRegistered, ApplicationCreated, ConsensusTimestamp, CoreError,
    DecisionOverridden, EventKind, LoggedEvent,
};

use crate::anomaly::{Anomaly, StateConflict};
use crate::application::{ApplicationState, ApplicationStatus, Transition};
use crate::model::{Evaluation, ModelKey, ModelVersionState, Registration};

/// State derived from the event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    applications: BTreeMap<String, ApplicationState>,
    models: BTreeMap<ModelKey, ModelVersionState>,
    anomalies: Vec<Anomaly>,
    unrecognized: usize,
    applied: usize,
    last_applied: Option<ConsensusTimestamp>,
}

impl Projection {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sequence of events, in the order given.
    pub fn replay<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a LoggedEvent>,
    {
        events
            .into_iter()
            .fold(Self::new(), |state, logged| state.apply(logged))
    }

    /// Apply one event, producing the next state.
    pub fn apply(mut self, logged: &LoggedEvent) -> Self {
        self.apply_in_place(logged);
        self
    }

    fn apply_in_place(&mut self, logged: &LoggedEvent) {
        let at = logged.consensus_timestamp;
        self.applied += 1;
        self.last_applied = Some(self.last_applied.map_or(at, |prev| prev.max(at)));

        let outcome = match &logged.event.kind {
            EventKind::ApplicationCreated => logged
                .event
                .decode_payload::<ApplicationCreated>()
                .map(|p| self.on_created(p, logged.event.timestamp, at)),
            EventKind::DecisionOverridden => logged
                .event
                .decode_payload::<DecisionOverridden>()
                .map(|p| self.on_overridden(p, at)),
            EventKind::AiVersionRegistered => logged
                .event
                .decode_payload::<AiVersionRegistered>()
                .map(|p| self.on_registered(p, at)),
            EventKind::AiVersionEvaluated => logged
                .event
                .decode_payload::<AiVersionEvaluated>()
                .map(|p| self.on_evaluated(p, at)),
            EventKind::Other(_) => {
                self.unrecognized += 1;
                Ok(())
            }
        };

        if let Err(err) = outcome {
            self.record(
                at,
                StateConflict::Malformed {
                    event_type: logged.event.kind.to_string(),
                    reason: malformed_reason(err),
                },
            );
        }
    }

    fn on_created(&mut self, payload: ApplicationCreated, created_at: i64, at: ConsensusTimestamp) {
        let current = self.applications.get(&payload.application_id).map(|a| a.status);
        match ApplicationStatus::next(current, Transition::Create) {
            Ok(status) => {
                self.applications.insert(
                    payload.application_id.clone(),
                    ApplicationState {
                        application_id: payload.application_id,
                        status,
                        amount: payload.amount,
                        last_reason: None,
                        created_at,
                        updated_at: at,
                    },
                );
            }
            Err(conflict) => self.record(
                at,
                StateConflict::from_transition(conflict, &payload.application_id, None),
            ),
        }
    }

    fn on_overridden(&mut self, payload: DecisionOverridden, at: ConsensusTimestamp) {
        let current = self.applications.get(&payload.application_id).map(|a| a.status);
        match ApplicationStatus::next(current, Transition::Override) {
            Ok(status) => {
                if let Some(app) = self.applications.get_mut(&payload.application_id) {
                    app.status = status;
                    app.last_reason = Some(payload.reason);
                    app.updated_at = at;
                }
            }
            Err(conflict) => self.record(
                at,
                StateConflict::from_transition(
                    conflict,
                    &payload.application_id,
                    Some(&payload.reason),
                ),
            ),
        }
    }

    fn on_registered(&mut self, payload: AiVersionRegistered, at: ConsensusTimestamp) {
        let key = ModelKey::new(payload.model_id.clone(), payload.version.clone());
        self.models.entry(key).or_default().registration =
            Some(Registration::from_payload(payload, at));
    }

    fn on_evaluated(&mut self, payload: AiVersionEvaluated, at: ConsensusTimestamp) {
        let key = ModelKey::new(payload.model_id.clone(), payload.version.clone());
        let entry = self.models.entry(key).or_default();
        let orphan = (!entry.is_registered()).then(|| StateConflict::OrphanedEvaluation {
            model_id: payload.model_id.clone(),
            version: payload.version.clone(),
            eval_id: payload.eval_id.clone(),
        });
        entry.evaluations.push(Evaluation::from_payload(payload, at));

        if let Some(conflict) = orphan {
            self.record(at, conflict);
        }
    }

    fn record(&mut self, at: ConsensusTimestamp, conflict: StateConflict) {
        self.anomalies.push(Anomaly {
            consensus_timestamp: at,
            conflict,
        });
    }

    /// Look up an application.
    pub fn application(&self, application_id: &str) -> Option<&ApplicationState> {
        self.applications.get(application_id)
    }

    /// Status of an application, if known.
    pub fn status_of(&self, application_id: &str) -> Option<ApplicationStatus> {
        self.application(application_id).map(|a| a.status)
    }

    /// All applications, ordered by ID.
    pub fn applications(&self) -> impl Iterator<Item = &ApplicationState> {
        self.applications.values()
    }

    /// Look up a model version.
    pub fn model(&self, model_id: &str, version: &str) -> Option<&ModelVersionState> {
        self.models.get(&ModelKey::new(model_id, version))
    }

    /// All model versions, ordered by key.
    pub fn models(&self) -> impl Iterator<Item = (&ModelKey, &ModelVersionState)> {
        self.models.iter()
    }

    /// Anomalies, in the order they were found.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Number of events of unrecognized kind that were skipped.
    pub fn unrecognized(&self) -> usize {
        self.unrecognized
    }

    /// Number of events applied, including skipped ones.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Newest consensus timestamp applied.
    pub fn last_applied(&self) -> Option<ConsensusTimestamp> {
        self.last_applied
    }
}

fn malformed_reason(err: CoreError) -> String {
    match err {
        CoreError::DecodingError(reason) => reason,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::{Event, EventBuilder};
    use proptest::prelude::*;
    use serde_json::json;

    fn at(secs: u64) -> ConsensusTimestamp {
        ConsensusTimestamp::new(secs, 0).unwrap()
    }

    fn logged(secs: u64, event: Event) -> LoggedEvent {
        LoggedEvent::new(at(secs), event)
    }

    fn created(id: &str, amount: f64) -> Event {
        EventBuilder::new(EventKind::ApplicationCreated)
            .timestamp(1_000)
            .field("applicationId", id)
            .field("amount", amount)
            .build()
    }

    fn overridden(id: &str, reason: &str) -> Event {
        EventBuilder::new(EventKind::DecisionOverridden)
            .timestamp(2_000)
            .field("applicationId", id)
            .field("reason", reason)
            .build()
    }

    fn registered(model: &str, version: &str) -> Event {
        EventBuilder::new(EventKind::AiVersionRegistered)
            .timestamp(3_000)
            .field("modelId", model)
            .field("version", version)
            .field("repoUrl", "https://example.org/repo")
            .field("artifactHash", "sha256:abc")
            .build()
    }

    fn evaluated(model: &str, version: &str, eval_id: &str) -> Event {
        EventBuilder::new(EventKind::AiVersionEvaluated)
            .timestamp(4_000)
            .field("modelId", model)
            .field("version", version)
            .field("evalId", eval_id)
            .field("dataset", "holdout")
            .field("metrics", json!({"auc": 0.9}))
            .field("passed", true)
            .build()
    }

    #[test]
    fn test_create_then_override() {
        let state = Projection::replay(&[
            logged(1, created("A1", 500.0)),
            logged(2, overridden("A1", "manual review")),
        ]);
        let app = state.application("A1").unwrap();
        assert_eq!(app.status, ApplicationStatus::Overridden);
        assert_eq!(app.amount, 500.0);
        assert_eq!(app.last_reason.as_deref(), Some("manual review"));
        assert_eq!(app.updated_at, at(2));
        assert!(state.anomalies().is_empty());
    }

    #[test]
    fn test_second_override_is_anomaly() {
        let state = Projection::replay(&[
            logged(1, created("A1", 500.0)),
            logged(2, overridden("A1", "first")),
            logged(3, overridden("A1", "second")),
        ]);
        let app = state.application("A1").unwrap();
        assert_eq!(app.last_reason.as_deref(), Some("first"));
        assert_eq!(
            state.anomalies(),
            &[Anomaly {
                consensus_timestamp: at(3),
                conflict: StateConflict::ConflictingOverride {
                    application_id: "A1".into(),
                    reason: "second".into()
                }
            }]
        );
    }

    #[test]
    fn test_orphaned_override() {
        let state = Projection::replay(&[logged(1, overridden("ghost", "x"))]);
        assert!(state.application("ghost").is_none());
        assert!(matches!(
            state.anomalies()[0].conflict,
            StateConflict::OrphanedOverride { .. }
        ));
    }

    #[test]
    fn test_recreate_refreshes_amount() {
        let state = Projection::replay(&[
            logged(1, created("A1", 500.0)),
            logged(2, created("A1", 750.0)),
        ]);
        let app = state.application("A1").unwrap();
        assert_eq!(app.status, ApplicationStatus::Created);
        assert_eq!(app.amount, 750.0);
        assert!(state.anomalies().is_empty());
    }

    #[test]
    fn test_recreate_after_override_leaves_state() {
        let state = Projection::replay(&[
            logged(1, created("A1", 500.0)),
            logged(2, overridden("A1", "r")),
            logged(3, created("A1", 999.0)),
        ]);
        let app = state.application("A1").unwrap();
        assert_eq!(app.status, ApplicationStatus::Overridden);
        assert_eq!(app.amount, 500.0);
        assert!(matches!(
            state.anomalies()[0].conflict,
            StateConflict::ReCreatedAfterOverride { .. }
        ));
    }

    #[test]
    fn test_model_registration_and_evaluations() {
        let state = Projection::replay(&[
            logged(1, registered("m", "1")),
            logged(2, evaluated("m", "1", "E1")),
            logged(3, evaluated("m", "1", "E2")),
        ]);
        let model = state.model("m", "1").unwrap();
        assert!(model.is_registered());
        assert_eq!(model.evaluations.len(), 2);
        assert_eq!(model.latest_evaluation().unwrap().eval_id, "E2");
        assert_eq!(model.evaluations[0].metrics["auc"], 0.9);
    }

    #[test]
    fn test_reregistration_keeps_evaluations() {
        let mut second = registered("m", "1");
        second
            .payload
            .insert("artifactHash".into(), json!("sha256:def"));
        let state = Projection::replay(&[
            logged(1, registered("m", "1")),
            logged(2, evaluated("m", "1", "E1")),
            logged(3, second),
        ]);
        let model = state.model("m", "1").unwrap();
        assert_eq!(model.registration.as_ref().unwrap().artifact_hash, "sha256:def");
        assert_eq!(model.evaluations.len(), 1);
    }

    #[test]
    fn test_orphaned_evaluation_kept_and_flagged() {
        let state = Projection::replay(&[logged(1, evaluated("m", "9", "E1"))]);
        let model = state.model("m", "9").unwrap();
        assert!(!model.is_registered());
        assert_eq!(model.evaluations.len(), 1);
        assert!(matches!(
            state.anomalies()[0].conflict,
            StateConflict::OrphanedEvaluation { .. }
        ));
    }

    #[test]
    fn test_unrecognized_counted() {
        let noise = EventBuilder::new(EventKind::Other("Audit".into())).build();
        let state = Projection::replay(&[logged(1, noise), logged(2, created("A1", 1.0))]);
        assert_eq!(state.unrecognized(), 1);
        assert_eq!(state.applied(), 2);
        assert_eq!(state.applications().count(), 1);
    }

    #[test]
    fn test_malformed_payload_recorded() {
        let bad = EventBuilder::new(EventKind::ApplicationCreated)
            .field("applicationId", "A1")
            .field("amount", "lots")
            .build();
        let state = Projection::replay(&[logged(1, bad)]);
        assert!(state.application("A1").is_none());
        assert!(matches!(
            state.anomalies()[0].conflict,
            StateConflict::Malformed { .. }
        ));
    }

    #[test]
    fn test_apply_is_pure() {
        let base = Projection::new().apply(&logged(1, created("A1", 1.0)));
        let snapshot = base.clone();
        let _next = base.clone().apply(&logged(2, overridden("A1", "r")));
        assert_eq!(base, snapshot);
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        let ids = prop::sample::select(vec!["A1", "A2", "A3"]);
        prop_oneof![
            (ids.clone(), 1u32..10_000).prop_map(|(id, amount)| created(id, amount as f64)),
            (ids, "[a-z]{1,8}").prop_map(|(id, reason)| overridden(id, &reason)),
            prop::sample::select(vec!["1", "2"]).prop_map(|v| registered("m", v)),
            (prop::sample::select(vec!["1", "2"]), "[A-Z][0-9]").prop_map(|(v, e)| evaluated("m", v, &e)),
        ]
    }

    proptest! {
        #[test]
        fn prop_replay_deterministic(events in prop::collection::vec(arb_event(), 0..30)) {
            let log: Vec<LoggedEvent> = events
                .into_iter()
                .enumerate()
                .map(|(i, e)| logged(i as u64 + 1, e))
                .collect();
            prop_assert_eq!(Projection::replay(&log), Projection::replay(&log));
        }

        #[test]
        fn prop_at_most_one_override_applied(events in prop::collection::vec(arb_event(), 0..30)) {
            let log: Vec<LoggedEvent> = events
                .into_iter()
                .enumerate()
                .map(|(i, e)| logged(i as u64 + 1, e))
                .collect();
            let state = Projection::replay(&log);
            for app in state.applications() {
                let overrides = log
                    .iter()
                    .filter(|l| l.event.kind == EventKind::DecisionOverridden
                        && l.event.payload_str("applicationId") == Some(app.application_id.as_str()))
                    .count();
                let conflicts = state
                    .anomalies()
                    .iter()
                    .filter(|a| matches!(&a.conflict,
                        StateConflict::ConflictingOverride { application_id, .. }
                            | StateConflict::OrphanedOverride { application_id }
                            if *application_id == app.application_id))
                    .count();
                let applied = overrides - conflicts;
                prop_assert!(applied <= 1);
                prop_assert_eq!(applied == 1, app.is_overridden());
            }
        }
    }
}
