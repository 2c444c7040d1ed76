//! An in-process [`HttpClient`] backed by a route table.
//!
//! Used by tests and offline tooling to stand in for a site: static pages,
//! handler closures for endpoints that must inspect the request, redirects,
//! and a log of every request made.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::client::{Form, Headers, HttpClient};
use crate::error::{HttpError, Result};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A request as seen by [`MemoryHttp`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub form: Form,
    pub headers: Headers,
}

impl RecordedRequest {
    /// Value of a form field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> Result<String> + Send + Sync>;

#[derive(Clone)]
enum Route {
    Body(String),
    Handler(Handler),
    Redirect(String),
}

/// Route-table HTTP client.
#[derive(Default)]
pub struct MemoryHttp {
    routes: RwLock<HashMap<(Method, String), Route>>,
    log: Mutex<Vec<RecordedRequest>>,
}

impl MemoryHttp {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for GET `url`.
    pub fn on_get(&self, url: impl Into<String>, body: impl Into<String>) -> &Self {
        self.insert(Method::Get, url.into(), Route::Body(body.into()))
    }

    /// Answer GET `url` with a handler.
    pub fn on_get_with<F>(&self, url: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&RecordedRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.insert(Method::Get, url.into(), Route::Handler(Arc::new(handler)))
    }

    /// Answer POST `url` with a handler.
    pub fn on_post<F>(&self, url: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&RecordedRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.insert(Method::Post, url.into(), Route::Handler(Arc::new(handler)))
    }

    /// Redirect GET `from` to `to`.
    pub fn redirect(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        self.insert(Method::Get, from.into(), Route::Redirect(to.into()))
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests made to `url` with any method.
    pub fn request_count(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    fn insert(&self, method: Method, url: String, route: Route) -> &Self {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, url), route);
        self
    }

    fn route(&self, method: Method, url: &str) -> Option<Route> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(method, url.to_string()))
            .cloned()
    }

    fn record(&self, request: &RecordedRequest) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
    }

    /// Follow redirects; returns the final URL and its route.
    fn follow(&self, url: &str) -> Result<(String, Option<Route>)> {
        let mut current = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            match self.route(Method::Get, &current) {
                Some(Route::Redirect(next)) => current = next,
                other => return Ok((current, other)),
            }
        }
        Err(HttpError::InvalidRequest(format!(
            "too many redirects from {}",
            url
        )))
    }

    fn answer(route: Option<Route>, request: &RecordedRequest) -> Result<String> {
        match route {
            Some(Route::Body(body)) => Ok(body),
            Some(Route::Handler(handler)) => handler(request),
            Some(Route::Redirect(_)) | None => Err(HttpError::Status(404)),
        }
    }
}

#[async_trait]
impl HttpClient for MemoryHttp {
    async fn get(&self, url: &str, headers: &Headers) -> Result<String> {
        let request = RecordedRequest {
            method: Method::Get,
            url: url.to_string(),
            form: Form::new(),
            headers: headers.clone(),
        };
        self.record(&request);

        let (_, route) = self.follow(url)?;
        Self::answer(route, &request)
    }

    async fn post_form(&self, url: &str, form: &Form, headers: &Headers) -> Result<String> {
        let request = RecordedRequest {
            method: Method::Post,
            url: url.to_string(),
            form: form.clone(),
            headers: headers.clone(),
        };
        self.record(&request);

        Self::answer(self.route(Method::Post, url), &request)
    }

    async fn final_url(&self, url: &str, headers: &Headers) -> Result<String> {
        self.record(&RecordedRequest {
            method: Method::Get,
            url: url.to_string(),
            form: Form::new(),
            headers: headers.clone(),
        });

        let (landing, _) = self.follow(url)?;
        Ok(landing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::headers;

    #[tokio::test]
    async fn test_static_get() {
        let http = MemoryHttp::new();
        http.on_get("https://site.test/a", "hello");

        let body = http.get("https://site.test/a", &Headers::new()).await.unwrap();
        assert_eq!(body, "hello");
        assert_eq!(http.request_count("https://site.test/a"), 1);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let http = MemoryHttp::new();
        let err = http.get("https://site.test/missing", &Headers::new()).await.unwrap_err();
        assert!(matches!(err, HttpError::Status(404)));
    }

    #[tokio::test]
    async fn test_post_handler_sees_form_and_headers() {
        let http = MemoryHttp::new();
        http.on_post("https://site.test/api", |req| {
            let data = req.field("data").unwrap_or_default();
            let referer = req.header("Referer").unwrap_or_default();
            Ok(format!("{}@{}", data, referer))
        });

        let form = vec![("data".to_string(), "abc".to_string())];
        let body = http
            .post_form(
                "https://site.test/api",
                &form,
                &headers([("Referer", "https://site.test/")]),
            )
            .await
            .unwrap();

        assert_eq!(body, "abc@https://site.test/");
        assert_eq!(http.requests()[0].method, Method::Post);
    }

    #[tokio::test]
    async fn test_redirects() {
        let http = MemoryHttp::new();
        http.redirect("https://bouncer.test/", "https://mirror-2.test/")
            .on_get("https://mirror-2.test/", "home");

        let landing = http.final_url("https://bouncer.test/", &Headers::new()).await.unwrap();
        assert_eq!(landing, "https://mirror-2.test/");

        let body = http.get("https://bouncer.test/", &Headers::new()).await.unwrap();
        assert_eq!(body, "home");
    }

    #[tokio::test]
    async fn test_redirect_loop() {
        let http = MemoryHttp::new();
        http.redirect("https://a.test/", "https://b.test/")
            .redirect("https://b.test/", "https://a.test/");

        let err = http.final_url("https://a.test/", &Headers::new()).await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest(_)));
    }
}
