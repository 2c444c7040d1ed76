//! # Embed Resolver
//!
//! Turns an episode reference into playable stream URLs for sites that hide
//! their media behind passphrase-sealed embed fields and an encrypted
//! resolver endpoint.
//!
//! ## Overview
//!
//! Each site is a [`ProviderProfile`]: passphrases, endpoints, field patterns
//! and which optional steps it uses. One [`Resolver`] runs any profile:
//!
//! 1. Find the site root (following a bouncer once per process if needed)
//! 2. Extract the episode id and list delivery candidates ("servers")
//! 3. Per candidate: recover sealed fields from the embed page, build and seal
//!    a payload, sign it, POST it, and open the response
//! 4. Emit a [`ResolvedStream`] per successful candidate
//!
//! Candidates run concurrently. A failing candidate never aborts the others;
//! only when none succeed does the caller see
//! [`ResolveError::ResolutionFailed`] with every candidate's reason.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use embed_resolver::{EpisodeRef, ProviderProfile, Resolver, ResolverConfig};
//! use embed_resolver::http::{HttpConfig, WebClient};
//!
//! async fn example(profile_json: &str) {
//!     let profile = ProviderProfile::from_json(profile_json).unwrap();
//!     let http = Arc::new(WebClient::new(&HttpConfig::default()).unwrap());
//!     let resolver = Resolver::new(profile, http, ResolverConfig::from_env()).unwrap();
//!
//!     resolver
//!         .resolve_with(&EpisodeRef::id("12345"), |stream| {
//!             println!("{:?} {}", stream.kind, stream.url);
//!         })
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `embed_resolver::crypto` - key derivation, cipher and envelope codec
//! - `embed_resolver::http` - the HTTP capability and its implementations

pub mod base_url;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod profile;
pub mod resolver;
pub mod response;
pub mod stream;

// Re-export component crates
pub use embed_resolver_core as crypto;
pub use embed_resolver_http as http;

pub use base_url::BaseUrlCache;
pub use config::ResolverConfig;
pub use context::{Candidate, EpisodeRef, ResolutionContext};
pub use error::{CandidateFailure, ResolveError, Result, Stage};
pub use profile::{
    Delivery, EmbedField, FieldPattern, FormField, Part, ProviderProfile, ResolverSpec,
    ServerListing, SignatureSpec,
};
pub use resolver::Resolver;
pub use response::ResolverResponse;
pub use stream::{ResolvedStream, StreamKind};
