//! Event validation: structural checks applied at ingestion.
//!
//! Producers validate before hashing and publishing; readers validate after
//! decoding. Unrecognized event kinds pass, their payload is not interpreted.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::event::{Event, EventKind};

/// Validate an event's payload shape for its kind.
///
/// This performs:
/// - Required string fields present and non-empty
/// - `amount` numeric
/// - `metrics` a flat mapping of name to number
/// - Optional fields, when present, of the right type
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    let kind = &event.kind;
    let payload = &event.payload;

    match kind {
        EventKind::ApplicationCreated => {
            require_str(kind, payload, "applicationId")?;
            require_number(kind, payload, "amount")?;
            optional_str(kind, payload, "status")?;
        }
        EventKind::DecisionOverridden => {
            require_str(kind, payload, "applicationId")?;
            require_str(kind, payload, "reason")?;
            optional_str(kind, payload, "newStatus")?;
        }
        EventKind::AiVersionRegistered => {
            require_str(kind, payload, "modelId")?;
            require_str(kind, payload, "version")?;
            require_str(kind, payload, "repoUrl")?;
            require_str(kind, payload, "artifactHash")?;
            optional_str(kind, payload, "description")?;
        }
        EventKind::AiVersionEvaluated => {
            require_str(kind, payload, "modelId")?;
            require_str(kind, payload, "version")?;
            require_str(kind, payload, "evalId")?;
            require_str(kind, payload, "dataset")?;
            validate_metrics(kind, payload.get("metrics"))?;
            optional_str(kind, payload, "notes")?;
            match payload.get("passed") {
                None | Some(Value::Null) | Some(Value::Bool(_)) => {}
                Some(_) => return Err(invalid(kind, "passed", "must be a boolean")),
            }
        }
        EventKind::Other(_) => {}
    }

    Ok(())
}

fn require_str(
    kind: &EventKind,
    payload: &Map<String, Value>,
    field: &'static str,
) -> Result<(), ValidationError> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(missing(kind, field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(invalid(kind, field, "must not be empty")),
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(kind, field, "must be a string")),
    }
}

fn optional_str(
    kind: &EventKind,
    payload: &Map<String, Value>,
    field: &'static str,
) -> Result<(), ValidationError> {
    match payload.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(kind, field, "must be a string")),
    }
}

fn require_number(
    kind: &EventKind,
    payload: &Map<String, Value>,
    field: &'static str,
) -> Result<(), ValidationError> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(missing(kind, field)),
        Some(Value::Number(_)) => Ok(()),
        Some(_) => Err(invalid(kind, field, "must be a number")),
    }
}

fn validate_metrics(kind: &EventKind, metrics: Option<&Value>) -> Result<(), ValidationError> {
    let map = match metrics {
        None | Some(Value::Null) => return Err(missing(kind, "metrics")),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::InvalidMetrics("not an object".into())),
    };
    for (name, value) in map {
        if !value.is_number() {
            return Err(ValidationError::InvalidMetrics(format!(
                "`{name}` is not a number"
            )));
        }
    }
    Ok(())
}

fn missing(kind: &EventKind, field: &'static str) -> ValidationError {
    ValidationError::MissingField {
        kind: kind.to_string(),
        field,
    }
}

fn invalid(kind: &EventKind, field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        kind: kind.to_string(),
        field,
        reason: reason.to_string(),
    }
}
