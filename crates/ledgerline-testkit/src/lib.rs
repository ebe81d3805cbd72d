//! # Ledgerline Testkit
//!
//! Testing utilities for Ledgerline.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known events with their canonical form and SHA-256 hash
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helpers for building event chains and seeding topics
//!
//! ## Golden Vectors
//!
//! Golden vectors pin canonicalization so any producer can be checked
//! against it:
//!
//! ```rust
//! use ledgerline_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     let event = vector.event();
//!     assert_eq!(event.canonical_content().unwrap(), vector.canonical);
//!     assert_eq!(event.compute_hash().unwrap().to_string(), vector.hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledgerline_testkit::generators::application_event;
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(event in application_event()) {
//!         prop_assert_eq!(event.compute_hash().unwrap(), event.compute_hash().unwrap());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ledgerline_testkit::fixtures::ChainFixture;
//!
//! let mut chain = ChainFixture::new();
//! let created = chain.application_created("A-1", 100.0);
//! let overridden = chain.decision_overridden("A-1", "review");
//! assert_eq!(overridden.prev_hash, Some(created.compute_hash().unwrap()));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{seeded_topic, ChainFixture};
pub use generators::{application_event, logged_events, EventParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
