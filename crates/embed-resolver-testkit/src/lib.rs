//! # Embed Resolver Testkit
//!
//! Testing utilities for the embed resolver.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: key derivation, envelope and signature outputs that
//!   match `openssl enc`, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: fake sites (profile plus in-memory HTTP) for end-to-end tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use embed_resolver_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "{}", name);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use embed_resolver::EpisodeRef;
//! use embed_resolver_testkit::fixtures::SiteFixture;
//!
//! async fn example() {
//!     let site = SiteFixture::signed_resolver();
//!     let resolver = site.resolver().unwrap();
//!     let streams = resolver.resolve(&EpisodeRef::id("ep-1")).await.unwrap();
//!     assert_eq!(streams[0].url, site.media[0]);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{seal, SiteFixture};
pub use generators::PayloadParams;
pub use vectors::{envelope_vectors, kdf_vectors, signature_vectors, verify_all_vectors};
