//! [`HttpClient`] over `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

use crate::client::{Form, Headers, HttpClient};
use crate::error::{HttpError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default browser user agent; embed hosts reject library agents.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for [`WebClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Accept self-signed or expired certificates (many embed mirrors have them).
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
        }
    }
}

/// `reqwest`-backed client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct WebClient {
    http: Client,
}

impl WebClient {
    /// Build a client from configuration.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        Ok(Self { http })
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }

    fn with_headers(builder: RequestBuilder, headers: &Headers) -> RequestBuilder {
        headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()))
    }

    async fn read_text(response: Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| HttpError::Network(e.to_string()))
    }
}

#[async_trait]
impl HttpClient for WebClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<String> {
        debug!("GET {}", url);

        let response = Self::with_headers(self.http.get(url), headers)
            .send()
            .await?;

        Self::read_text(response).await
    }

    async fn post_form(&self, url: &str, form: &Form, headers: &Headers) -> Result<String> {
        debug!("POST {} ({} fields)", url, form.len());

        let response = Self::with_headers(self.http.post(url), headers)
            .form(form)
            .send()
            .await?;

        Self::read_text(response).await
    }

    async fn final_url(&self, url: &str, headers: &Headers) -> Result<String> {
        debug!("Following redirects from {}", url);

        let response = Self::with_headers(self.http.get(url), headers)
            .send()
            .await?;

        // The landing page may well be a 403 challenge; only its location matters.
        Ok(response.url().to_string())
    }
}
