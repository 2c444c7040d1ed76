//! The HTTP capability consumed by the resolver.
//!
//! The resolver never manages cookies, redirects or TLS itself. It sees
//! three operations: fetch text, post a urlencoded form, and find where a
//! URL finally lands.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;

/// Request or response header set, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Ordered `application/x-www-form-urlencoded` fields.
pub type Form = Vec<(String, String)>;

/// Text-level HTTP operations.
///
/// Implementations must be thread-safe (Send + Sync); one client is shared by
/// every concurrent candidate resolution.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body as text.
    async fn get(&self, url: &str, headers: &Headers) -> Result<String>;

    /// POST `form` urlencoded to `url` and return the body as text.
    async fn post_form(&self, url: &str, form: &Form, headers: &Headers) -> Result<String>;

    /// Follow redirects from `url` and return the final URL.
    async fn final_url(&self, url: &str, headers: &Headers) -> Result<String>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn get(&self, url: &str, headers: &Headers) -> Result<String> {
        (**self).get(url, headers).await
    }

    async fn post_form(&self, url: &str, form: &Form, headers: &Headers) -> Result<String> {
        (**self).post_form(url, form, headers).await
    }

    async fn final_url(&self, url: &str, headers: &Headers) -> Result<String> {
        (**self).final_url(url, headers).await
    }
}

/// Build a header set from `(name, value)` pairs.
pub fn headers<I, K, V>(pairs: I) -> Headers
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
