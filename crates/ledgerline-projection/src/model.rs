//! AI model version state.

use serde::Serialize;
use std::fmt;

use ledgerline_core::{AiVersionEvaluated, AiVersionRegistered, ConsensusTimestamp, Metrics};

/// Identifies one version of a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelKey {
    pub model_id: String,
    pub version: String,
}

impl ModelKey {
    pub fn new(model_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model_id, self.version)
    }
}

/// A model version registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub repo_url: String,
    pub artifact_hash: String,
    pub description: Option<String>,
    pub registered_at: ConsensusTimestamp,
}

impl Registration {
    pub(crate) fn from_payload(payload: AiVersionRegistered, at: ConsensusTimestamp) -> Self {
        Self {
            repo_url: payload.repo_url,
            artifact_hash: payload.artifact_hash,
            description: payload.description,
            registered_at: at,
        }
    }
}

/// One evaluation run of a model version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub eval_id: String,
    pub dataset: String,
    pub metrics: Metrics,
    pub passed: bool,
    pub notes: Option<String>,
    pub evaluated_at: ConsensusTimestamp,
}

impl Evaluation {
    pub(crate) fn from_payload(payload: AiVersionEvaluated, at: ConsensusTimestamp) -> Self {
        Self {
            eval_id: payload.eval_id,
            dataset: payload.dataset,
            metrics: payload.metrics,
            passed: payload.passed,
            notes: payload.notes,
            evaluated_at: at,
        }
    }
}

/// Derived state of one model version.
///
/// Evaluations may exist without a registration (orphaned).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelVersionState {
    pub registration: Option<Registration>,
    pub evaluations: Vec<Evaluation>,
}

impl ModelVersionState {
    /// Check if the version has been registered.
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// The most recent evaluation, if any.
    pub fn latest_evaluation(&self) -> Option<&Evaluation> {
        self.evaluations.last()
    }
}
