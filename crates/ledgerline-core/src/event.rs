//! Event: the atomic unit of the ledger.
//!
//! An event is immutable once hashed. Changes are represented as new events
//! that link back to their predecessor through `prevHash`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::canonicalize;
use crate::crypto::EventHash;
use crate::error::{CanonicalizationError, CoreError, ValidationError};
use crate::types::ConsensusTimestamp;

/// Wire field names.
mod fields {
    pub const TYPE: &str = "type";
    pub const PAYLOAD: &str = "payload";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PREV_HASH: &str = "prevHash";
}

/// Evaluation metrics: metric name to numeric value.
pub type Metrics = BTreeMap<String, f64>;

/// The kind of event, determining how the payload is interpreted.
///
/// Types this build does not know are kept verbatim in [`EventKind::Other`]
/// so that a newer producer cannot break an older reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ApplicationCreated,
    DecisionOverridden,
    AiVersionRegistered,
    AiVersionEvaluated,
    Other(String),
}

impl EventKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::ApplicationCreated => "ApplicationCreated",
            EventKind::DecisionOverridden => "DecisionOverridden",
            EventKind::AiVersionRegistered => "AIVersionRegistered",
            EventKind::AiVersionEvaluated => "AIVersionEvaluated",
            EventKind::Other(name) => name,
        }
    }

    /// Parse a wire name. Never fails: unknown names become `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ApplicationCreated" => EventKind::ApplicationCreated,
            "DecisionOverridden" => EventKind::DecisionOverridden,
            "AIVersionRegistered" => EventKind::AiVersionRegistered,
            "AIVersionEvaluated" => EventKind::AiVersionEvaluated,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Check if this is one of the known kinds.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }

    /// Check if this kind belongs to the loan application lifecycle.
    pub fn is_application(&self) -> bool {
        matches!(
            self,
            EventKind::ApplicationCreated | EventKind::DecisionOverridden
        )
    }

    /// Check if this kind belongs to the AI model lifecycle.
    pub fn is_model(&self) -> bool {
        matches!(
            self,
            EventKind::AiVersionRegistered | EventKind::AiVersionEvaluated
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EventKind::from_name(&name))
    }
}

/// A typed payload for one of the known event kinds.
pub trait EventPayload: Serialize + DeserializeOwned {
    /// The kind of event carrying this payload.
    const KIND: EventKind;
}

/// Payload of `ApplicationCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCreated {
    pub application_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EventPayload for ApplicationCreated {
    const KIND: EventKind = EventKind::ApplicationCreated;
}

/// Payload of `DecisionOverridden`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOverridden {
    pub application_id: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<String>,
}

impl EventPayload for DecisionOverridden {
    const KIND: EventKind = EventKind::DecisionOverridden;
}

/// Payload of `AIVersionRegistered`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiVersionRegistered {
    pub model_id: String,
    pub version: String,
    pub repo_url: String,
    pub artifact_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventPayload for AiVersionRegistered {
    const KIND: EventKind = EventKind::AiVersionRegistered;
}

/// Payload of `AIVersionEvaluated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiVersionEvaluated {
    pub model_id: String,
    pub version: String,
    pub eval_id: String,
    pub dataset: String,
    pub metrics: Metrics,
    #[serde(default)]
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EventPayload for AiVersionEvaluated {
    const KIND: EventKind = EventKind::AiVersionEvaluated;
}

/// A domain event as published to a topic.
///
/// Serializes to the nested wire form
/// `{"type", "payload", "timestamp", "prevHash"?}`. Deserialization also
/// accepts the flat legacy form in which payload fields sit at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Event {
    /// The kind of event.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Kind-specific fields.
    pub payload: Map<String, Value>,

    /// Producer-claimed creation time (Unix milliseconds). Untrusted, not an
    /// ordering key.
    pub timestamp: i64,

    /// Hash of the logically preceding event in this event's chain.
    #[serde(rename = "prevHash", default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<EventHash>,
}

impl Event {
    /// Create a chain-head event.
    pub fn new(kind: EventKind, payload: Map<String, Value>, timestamp: i64) -> Self {
        Self {
            kind,
            payload,
            timestamp,
            prev_hash: None,
        }
    }

    /// Create an event from a typed payload.
    pub fn from_payload<P: EventPayload>(payload: &P, timestamp: i64) -> Result<Self, CoreError> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => Ok(Self::new(P::KIND, map, timestamp)),
            _ => Err(CoreError::EncodingError("payload must serialize to an object".into())),
        }
    }

    /// Decode the payload into its typed form.
    pub fn decode_payload<P: EventPayload>(&self) -> Result<P, CoreError> {
        if self.kind != P::KIND {
            return Err(CoreError::DecodingError(format!(
                "expected {} payload, event is {}",
                P::KIND,
                self.kind
            )));
        }
        Ok(serde_json::from_value(Value::Object(self.payload.clone()))?)
    }

    /// Set the chain link.
    pub fn with_prev_hash(mut self, prev: EventHash) -> Self {
        self.prev_hash = Some(prev);
        self
    }

    /// Look up a string payload field.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }

    /// Canonical rendering of everything except `prevHash`.
    ///
    /// This is the exact hash input.
    pub fn canonical_content(&self) -> Result<String, CanonicalizationError> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| CanonicalizationError::Unserializable(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.remove(fields::PREV_HASH);
        }
        canonicalize(&value)
    }

    /// Compute the event hash: SHA-256 over the canonical content.
    ///
    /// Changing only `prevHash` never changes the result.
    pub fn compute_hash(&self) -> Result<EventHash, CanonicalizationError> {
        let content = self.canonical_content()?;
        Ok(EventHash::sha256(content.as_bytes()))
    }

    /// The `prevHash` value the next event in this chain should carry.
    pub fn link_next(&self) -> Result<EventHash, CanonicalizationError> {
        self.compute_hash()
    }

    /// Check if this event starts a chain.
    pub fn is_chain_head(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// Encode to UTF-8 JSON wire bytes (nested form).
    pub fn to_wire(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from UTF-8 JSON wire bytes (nested or flat form).
    pub fn from_wire(bytes: &[u8]) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_wire_value(value)
    }

    /// Decode from an already-parsed JSON value (nested or flat form).
    ///
    /// A flat event is normalized to the nested form: its hash, and so the
    /// `prevHash` its successor must carry, is that of the nested rendering,
    /// not of the flat object as it appeared on the wire.
    pub fn from_wire_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(mut obj) = value else {
            return Err(ValidationError::NotAnObject.into());
        };

        let kind = match obj.remove(fields::TYPE) {
            Some(Value::String(name)) => EventKind::from_name(&name),
            _ => return Err(ValidationError::MissingType.into()),
        };

        let timestamp = match obj.remove(fields::TIMESTAMP) {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(ts) => ts,
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
                    .ok_or_else(|| invalid(&kind, fields::TIMESTAMP, "must be an integer"))?,
            },
            Some(_) => return Err(invalid(&kind, fields::TIMESTAMP, "must be an integer").into()),
            None => {
                return Err(ValidationError::MissingField {
                    kind: kind.to_string(),
                    field: fields::TIMESTAMP,
                }
                .into())
            }
        };

        let prev_hash = match obj.remove(fields::PREV_HASH) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                s.parse::<EventHash>()
                    .map_err(|e| invalid(&kind, fields::PREV_HASH, &e.to_string()))?,
            ),
            Some(_) => return Err(invalid(&kind, fields::PREV_HASH, "must be a string").into()),
        };

        let payload = match obj.remove(fields::PAYLOAD) {
            Some(Value::Object(payload)) => payload,
            Some(_) => return Err(invalid(&kind, fields::PAYLOAD, "must be an object").into()),
            // Legacy flat form: whatever is left is the payload.
            None => obj,
        };

        Ok(Self {
            kind,
            payload,
            timestamp,
            prev_hash,
        })
    }
}

impl AsRef<Event> for Event {
    fn as_ref(&self) -> &Event {
        self
    }
}

impl TryFrom<Value> for Event {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Event::from_wire_value(value)
    }
}

fn invalid(kind: &EventKind, field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        kind: kind.to_string(),
        field,
        reason: reason.to_string(),
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    kind: EventKind,
    payload: Map<String, Value>,
    timestamp: i64,
    prev_hash: Option<EventHash>,
}

impl EventBuilder {
    /// Start building an event.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: Map::new(),
            timestamp: 0,
            prev_hash: None,
        }
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Set one payload field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Replace the whole payload.
    pub fn payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Set the previous event hash.
    pub fn prev(mut self, prev: EventHash) -> Self {
        self.prev_hash = Some(prev);
        self
    }

    /// Build the event.
    pub fn build(self) -> Event {
        Event {
            kind: self.kind,
            payload: self.payload,
            timestamp: self.timestamp,
            prev_hash: self.prev_hash,
        }
    }
}

/// An event accepted by the ledger, with its authoritative ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    /// Ledger-assigned total-order key.
    pub consensus_timestamp: ConsensusTimestamp,

    /// Topic sequence number, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,

    /// The event itself.
    pub event: Event,
}

impl LoggedEvent {
    /// Pair an event with its consensus timestamp.
    pub fn new(consensus_timestamp: ConsensusTimestamp, event: Event) -> Self {
        Self {
            consensus_timestamp,
            sequence_number: None,
            event,
        }
    }

    /// Attach the topic sequence number.
    pub fn with_sequence_number(mut self, seq: u64) -> Self {
        self.sequence_number = Some(seq);
        self
    }

    /// Get the event kind.
    pub fn kind(&self) -> &EventKind {
        &self.event.kind
    }
}

impl AsRef<Event> for LoggedEvent {
    fn as_ref(&self) -> &Event {
        &self.event
    }
}
