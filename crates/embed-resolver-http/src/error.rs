//! Error types for the HTTP capability.

use thiserror::Error;

/// Errors from an [`HttpClient`](crate::HttpClient) call.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, TLS, timeout or body read failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request could not be built (bad URL, header, redirect loop).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => HttpError::Status(status.as_u16()),
            None if e.is_builder() => HttpError::InvalidRequest(e.to_string()),
            None => HttpError::Network(e.to_string()),
        }
    }
}

/// Result type for HTTP operations.
pub type Result<T> = std::result::Result<T, HttpError>;
