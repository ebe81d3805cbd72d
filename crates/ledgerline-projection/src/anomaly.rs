//! Audit anomalies recorded while projecting.
//!
//! Anomalies are part of the derived state. They are never raised as errors.

use serde::Serialize;
use std::fmt;

use ledgerline_core::ConsensusTimestamp;

use crate::error::TransitionConflict;

/// A state conflict found in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StateConflict {
    /// `ApplicationCreated` for an application already overridden.
    #[serde(rename_all = "camelCase")]
    ReCreatedAfterOverride { application_id: String },

    /// `DecisionOverridden` for an application never created.
    #[serde(rename_all = "camelCase")]
    OrphanedOverride { application_id: String },

    /// A second `DecisionOverridden`.
    #[serde(rename_all = "camelCase")]
    ConflictingOverride {
        application_id: String,
        reason: String,
    },

    /// `AIVersionEvaluated` for a version never registered.
    #[serde(rename_all = "camelCase")]
    OrphanedEvaluation {
        model_id: String,
        version: String,
        eval_id: String,
    },

    /// A known event kind whose payload could not be read.
    #[serde(rename_all = "camelCase")]
    Malformed { event_type: String, reason: String },
}

impl StateConflict {
    /// Map a refused application transition.
    pub fn from_transition(
        conflict: TransitionConflict,
        application_id: &str,
        reason: Option<&str>,
    ) -> Self {
        let application_id = application_id.to_string();
        match conflict {
            TransitionConflict::NotCreated => StateConflict::OrphanedOverride { application_id },
            TransitionConflict::AlreadyOverridden => StateConflict::ConflictingOverride {
                application_id,
                reason: reason.unwrap_or_default().to_string(),
            },
            TransitionConflict::RecreatedAfterOverride => {
                StateConflict::ReCreatedAfterOverride { application_id }
            }
        }
    }
}

impl fmt::Display for StateConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateConflict::ReCreatedAfterOverride { application_id } => {
                write!(f, "{application_id}: re-created after override")
            }
            StateConflict::OrphanedOverride { application_id } => {
                write!(f, "{application_id}: override without creation")
            }
            StateConflict::ConflictingOverride {
                application_id,
                reason,
            } => write!(f, "{application_id}: conflicting override ({reason})"),
            StateConflict::OrphanedEvaluation {
                model_id,
                version,
                eval_id,
            } => write!(f, "{model_id}@{version}: evaluation {eval_id} before registration"),
            StateConflict::Malformed { event_type, reason } => {
                write!(f, "malformed {event_type}: {reason}")
            }
        }
    }
}

/// An anomaly and where in the log it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub consensus_timestamp: ConsensusTimestamp,
    pub conflict: StateConflict,
}
