//! Proxy failures and their mapping to caller-visible responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::LicenseScheme;

/// Everything that can go wrong between accepting a request and relaying
/// upstream response headers.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The PX token for the scheme is not configured.
    #[error("PX token for {0} is not configured")]
    MissingCredential(LicenseScheme),

    /// The media path would leave the configured base.
    #[error("invalid media path `{0}`")]
    InvalidMediaPath(String),

    /// DNS, refused connection, TLS failure.
    #[error("upstream connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// No upstream response within the deadline.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The client's own connect timeout fired.
    #[error("upstream connection timed out: {0}")]
    ConnectTimeout(#[source] reqwest::Error),

    /// Upstream closed or failed while its body was being read.
    #[error("failed to read upstream response: {0}")]
    Body(#[source] reqwest::Error),

    /// The outbound pool has been shut down.
    #[error("upstream pool is closed")]
    PoolClosed,
}

impl ProxyError {
    /// Classify an error returned while sending a request.
    ///
    /// The URL is stripped because license URLs embed the PX token.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProxyError::ConnectTimeout(err.without_url());
        }
        ProxyError::Connect(err.without_url())
    }

    pub fn from_body(err: reqwest::Error) -> Self {
        ProxyError::Body(err.without_url())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidMediaPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::Connect(_) | ProxyError::Body(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) | ProxyError::ConnectTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingCredential(_) => "config",
            ProxyError::InvalidMediaPath(_) => "invalid_path",
            ProxyError::Connect(_) => "connect",
            ProxyError::Timeout(_) | ProxyError::ConnectTimeout(_) => "timeout",
            ProxyError::Body(_) => "body",
            ProxyError::PoolClosed => "pool_closed",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::MissingCredential(_) => {
                "Server Configuration Error: Missing PX".to_string()
            }
            ProxyError::InvalidMediaPath(_) => "Invalid media path".to_string(),
            other => format!("Proxy Error: {}", other),
        };
        (self.status(), body).into_response()
    }
}
