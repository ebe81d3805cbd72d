//! # Ledgerline Projection
//!
//! Derived state computed by replaying the event log.
//!
//! ## Overview
//!
//! Instead of a mutable status map updated by request handlers, state is a
//! pure fold over the consensus-ordered log. The same log always projects
//! to the same [`Projection`].
//!
//! ## Key Concepts
//!
//! - **Application**: a loan application, `CREATED` then at most once `OVERRIDDEN`
//! - **Model version**: a registration plus the evaluations logged against it
//! - **Anomaly**: a conflict found in the log (second override, orphaned
//!   evaluation, ...), recorded for audit instead of raised
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledgerline_projection::Projection;
//!
//! let state = Projection::replay(reconciler.log());
//! if let Some(app) = state.application("A-1001") {
//!     println!("{} is {}", app.application_id, app.status);
//! }
//! ```

pub mod anomaly;
pub mod application;
pub mod error;
pub mod model;
pub mod state;

pub use anomaly::{Anomaly, StateConflict};
pub use application::{ApplicationState, ApplicationStatus, Transition};
pub use error::TransitionConflict;
pub use model::{Evaluation, ModelKey, ModelVersionState, Registration};
pub use state::Projection;
