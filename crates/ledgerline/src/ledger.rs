//! The Ledger: command surface for publishing domain events.
//!
//! Every command trims and validates its input, builds a well-formed event
//! linked to the head of its chain, and publishes it. Local state (chain
//! heads and projection) changes only after the topic accepts the event.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use ledgerline_core::{
    validate_event, AiVersionEvaluated, AiVersionRegistered, ApplicationCreated, ChainKey,
    DecisionOverridden, Event, EventHash, EventPayload, LoggedEvent, Metrics, TopicId,
    ValidationError,
};
use ledgerline_projection::{ApplicationStatus, Projection, Transition};
use ledgerline_topic::{Publisher, SubmitReceipt};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// An event the topic accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    /// The event as published.
    pub event: Event,
    /// Its hash, the `prevHash` of the next event in the chain.
    pub hash: EventHash,
    /// The topic's acknowledgement.
    pub receipt: SubmitReceipt,
}

impl Published {
    /// The event paired with its consensus timestamp.
    pub fn logged(&self) -> LoggedEvent {
        LoggedEvent::new(self.receipt.consensus_timestamp, self.event.clone())
            .with_sequence_number(self.receipt.sequence_number)
    }
}

#[derive(Default)]
struct LocalState {
    projection: Projection,
    heads: BTreeMap<ChainKey, EventHash>,
}

/// Publishes domain events to one topic.
///
/// Commands are serialized: each holds the local state until its publish
/// completes, so two events can never claim the same chain head.
pub struct Ledger<P: Publisher> {
    publisher: P,
    topic: TopicId,
    local: Mutex<LocalState>,
}

impl<P: Publisher> Ledger<P> {
    /// Create a ledger publishing to `topic`.
    pub fn new(publisher: P, topic: TopicId) -> Self {
        Self {
            publisher,
            topic,
            local: Mutex::new(LocalState::default()),
        }
    }

    /// Create a ledger from configuration.
    pub fn from_config(publisher: P, config: &LedgerConfig) -> Self {
        Self::new(publisher, config.topic.clone())
    }

    /// Resume a ledger from a topic's consensus-ordered log.
    ///
    /// The projection is rebuilt by replay and every chain head is set to the
    /// hash of the last event of that chain, so new events link to what is
    /// already on the topic.
    pub fn resume<'a, I>(publisher: P, topic: TopicId, log: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a LoggedEvent>,
    {
        let mut state = LocalState::default();
        for logged in log {
            if let Some(chain) = ChainKey::of(&logged.event) {
                state.heads.insert(chain, logged.event.compute_hash()?);
            }
            state.projection = std::mem::take(&mut state.projection).apply(logged);
        }
        tracing::info!(
            topic = %topic,
            chains = state.heads.len(),
            applications = state.projection.applications().count(),
            "ledger resumed"
        );
        Ok(Self {
            publisher,
            topic,
            local: Mutex::new(state),
        })
    }

    /// The topic this ledger publishes to.
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Get the publisher reference.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Snapshot of the locally projected state.
    pub async fn projection(&self) -> Projection {
        self.local.lock().await.projection.clone()
    }

    /// Current head of a chain, if any event of it was published here.
    pub async fn head(&self, chain: &ChainKey) -> Option<EventHash> {
        self.local.lock().await.heads.get(chain).copied()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Application Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a new loan application.
    ///
    /// Re-submitting a `CREATED` application refreshes its amount; an
    /// overridden one is refused.
    pub async fn create_application(&self, application_id: &str, amount: f64) -> Result<Published> {
        let application_id = required("ApplicationCreated", "applicationId", application_id)?;
        if !amount.is_finite() {
            return Err(ValidationError::InvalidField {
                kind: "ApplicationCreated".into(),
                field: "amount",
                reason: "must be a finite number".into(),
            }
            .into());
        }

        let mut local = self.local.lock().await;
        check_transition(&local.projection, &application_id, Transition::Create)?;

        let payload = ApplicationCreated {
            application_id: application_id.clone(),
            amount,
            status: Some(ApplicationStatus::Created.to_string()),
        };
        self.publish(&mut local, ChainKey::Application(application_id), &payload)
            .await
    }

    /// Override the decision on an application.
    ///
    /// The application must be known to this ledger and not yet overridden.
    pub async fn override_decision(&self, application_id: &str, reason: &str) -> Result<Published> {
        let application_id = required("DecisionOverridden", "applicationId", application_id)?;
        let reason = required("DecisionOverridden", "reason", reason)?;

        let mut local = self.local.lock().await;
        if local.projection.application(&application_id).is_none() {
            return Err(LedgerError::UnknownApplication(application_id));
        }
        check_transition(&local.projection, &application_id, Transition::Override)?;

        let payload = DecisionOverridden {
            application_id: application_id.clone(),
            reason,
            new_status: Some(ApplicationStatus::Overridden.to_string()),
        };
        self.publish(&mut local, ChainKey::Application(application_id), &payload)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Model Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a version of an AI model.
    pub async fn register_ai_version(&self, registration: AiVersionRegistered) -> Result<Published> {
        const KIND: &str = "AIVersionRegistered";
        let payload = AiVersionRegistered {
            model_id: required(KIND, "modelId", &registration.model_id)?,
            version: required(KIND, "version", &registration.version)?,
            repo_url: required(KIND, "repoUrl", &registration.repo_url)?,
            artifact_hash: required(KIND, "artifactHash", &registration.artifact_hash)?,
            description: optional(registration.description.as_deref()),
        };

        let chain = ChainKey::model(&payload.model_id, &payload.version);
        let mut local = self.local.lock().await;
        self.publish(&mut local, chain, &payload).await
    }

    /// Log an evaluation run of an AI model version.
    ///
    /// The version need not be registered; such evaluations are kept and
    /// flagged as orphaned by the projection.
    pub async fn log_ai_evaluation(&self, evaluation: AiVersionEvaluated) -> Result<Published> {
        const KIND: &str = "AIVersionEvaluated";
        let metrics = trimmed_metrics(evaluation.metrics)?;

        let payload = AiVersionEvaluated {
            model_id: required(KIND, "modelId", &evaluation.model_id)?,
            version: required(KIND, "version", &evaluation.version)?,
            eval_id: required(KIND, "evalId", &evaluation.eval_id)?,
            dataset: required(KIND, "dataset", &evaluation.dataset)?,
            metrics,
            passed: evaluation.passed,
            notes: optional(evaluation.notes.as_deref()),
        };

        let chain = ChainKey::model(&payload.model_id, &payload.version);
        let mut local = self.local.lock().await;
        self.publish(&mut local, chain, &payload).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Link, validate, publish, and on success advance local state.
    async fn publish<T: EventPayload>(
        &self,
        local: &mut LocalState,
        chain: ChainKey,
        payload: &T,
    ) -> Result<Published> {
        let mut event = Event::from_payload(payload, now_millis())?;
        if let Some(head) = local.heads.get(&chain) {
            event = event.with_prev_hash(*head);
        }
        validate_event(&event)?;
        let hash = event.compute_hash()?;

        let receipt = match self.publisher.submit(&self.topic, &event).await {
            Ok(receipt) => receipt,
            Err(error) => {
                tracing::warn!(topic = %self.topic, kind = %event.kind, %error, "publish failed");
                return Err(error.into());
            }
        };

        let published = Published {
            event,
            hash,
            receipt,
        };
        local.projection = std::mem::take(&mut local.projection).apply(&published.logged());
        local.heads.insert(chain, hash);

        tracing::info!(
            topic = %self.topic,
            kind = %published.event.kind,
            sequence = receipt.sequence_number,
            consensus = %receipt.consensus_timestamp,
            %hash,
            "event published"
        );
        Ok(published)
    }
}

fn check_transition(
    projection: &Projection,
    application_id: &str,
    transition: Transition,
) -> Result<()> {
    ApplicationStatus::next(projection.status_of(application_id), transition)
        .map(|_| ())
        .map_err(|conflict| LedgerError::Transition {
            application_id: application_id.to_string(),
            conflict,
        })
}

fn required(kind: &str, field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField {
            kind: kind.to_string(),
            field,
        }
        .into());
    }
    Ok(value.to_string())
}

/// Trim metric names. Blank names, non-finite values and names that collide
/// once trimmed are rejected.
fn trimmed_metrics(metrics: Metrics) -> Result<Metrics> {
    let mut trimmed = Metrics::new();
    for (name, value) in metrics {
        let key = name.trim();
        if key.is_empty() {
            return Err(ValidationError::InvalidMetrics("blank metric name".into()).into());
        }
        if !value.is_finite() {
            return Err(
                ValidationError::InvalidMetrics(format!("`{key}` is not a finite number")).into(),
            );
        }
        if trimmed.insert(key.to_string(), value).is_some() {
            return Err(
                ValidationError::InvalidMetrics(format!("`{key}` given more than once")).into(),
            );
        }
    }
    Ok(trimmed)
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
