//! # Embed Resolver HTTP
//!
//! The HTTP capability injected into the resolver.
//!
//! ## Overview
//!
//! The resolver treats HTTP as a stateless capability: `get`, `post_form` and
//! `final_url` over text bodies. It never owns cookies, redirects or TLS.
//!
//! - [`HttpClient`] - the async trait the resolver consumes
//! - [`WebClient`] - `reqwest` implementation
//! - [`MemoryHttp`] - route-table implementation for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use embed_resolver_http::{HttpClient, HttpConfig, WebClient, Headers};
//!
//! async fn example() {
//!     let client = WebClient::new(&HttpConfig::default()).unwrap();
//!     let page = client.get("https://example.com/", &Headers::new()).await.unwrap();
//!     println!("{} bytes", page.len());
//! }
//! ```

pub mod client;
pub mod error;
pub mod memory;
pub mod web;

pub use client::{headers, Form, Headers, HttpClient};
pub use error::{HttpError, Result};
pub use memory::{MemoryHttp, Method, RecordedRequest};
pub use web::{HttpConfig, WebClient};
