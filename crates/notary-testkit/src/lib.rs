//! # Notary Testkit
//!
//! Testing utilities for the Notary Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known documents with their expected content identifiers
//! - **Generators**: proptest strategies and seeded random corpora
//! - **Fixtures**: in-memory store and ledger wired up for test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use notary_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, computed) in verify_all_vectors() {
//!     assert!(matches, "{name}: {computed}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use notary_testkit::generators::document_bytes;
//!
//! proptest! {
//!     #[test]
//!     fn hashing_is_deterministic(doc in document_bytes(1024)) {
//!         prop_assert_eq!(notary_core::hash(&doc), notary_core::hash(&doc));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use notary_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     fixture.preload(6).await.unwrap();
//!     let indexer = fixture.indexer();
//!     indexer.start().await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{account, init_tracing, parties, party, TestFixture};
