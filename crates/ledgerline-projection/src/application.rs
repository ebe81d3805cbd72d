//! Loan application lifecycle.
//!
//! ```text
//!            ApplicationCreated          DecisionOverridden
//! (none) ------------------------> CREATED -----------------> OVERRIDDEN
//!                                  ^     |
//!                                  +-----+ ApplicationCreated (refresh)
//! ```
//!
//! Everything else is a [`TransitionConflict`].

use serde::{Deserialize, Serialize};
use std::fmt;

use ledgerline_core::ConsensusTimestamp;

use crate::error::{Result, TransitionConflict};

/// Lifecycle input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Create,
    Override,
}

/// Status of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Created,
    Overridden,
}

impl ApplicationStatus {
    /// The status an application starts in after `transition`.
    pub fn initial(transition: Transition) -> Result<Self> {
        match transition {
            Transition::Create => Ok(ApplicationStatus::Created),
            Transition::Override => Err(TransitionConflict::NotCreated),
        }
    }

    /// The status after applying `transition`.
    pub fn on(self, transition: Transition) -> Result<Self> {
        match (self, transition) {
            (ApplicationStatus::Created, Transition::Create) => Ok(ApplicationStatus::Created),
            (ApplicationStatus::Created, Transition::Override) => Ok(ApplicationStatus::Overridden),
            (ApplicationStatus::Overridden, Transition::Create) => {
                Err(TransitionConflict::RecreatedAfterOverride)
            }
            (ApplicationStatus::Overridden, Transition::Override) => {
                Err(TransitionConflict::AlreadyOverridden)
            }
        }
    }

    /// Transition from an optional current status.
    pub fn next(current: Option<Self>, transition: Transition) -> Result<Self> {
        match current {
            None => Self::initial(transition),
            Some(status) => status.on(transition),
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Created => "CREATED",
            ApplicationStatus::Overridden => "OVERRIDDEN",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived state of one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub application_id: String,
    pub status: ApplicationStatus,
    pub amount: f64,
    /// Reason given by the override, once overridden.
    pub last_reason: Option<String>,
    /// Producer timestamp of the latest creation event.
    pub created_at: i64,
    /// Consensus timestamp of the last event applied to this application.
    pub updated_at: ConsensusTimestamp,
}

impl ApplicationState {
    /// Check if the decision has been overridden.
    pub fn is_overridden(&self) -> bool {
        self.status == ApplicationStatus::Overridden
    }
}
