//! reqwest-backed transport.
//!
//! Joins each request path onto a base URL, applies a single bounded timeout
//! per execution and returns the upstream response verbatim (including error
//! status codes).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{HttpRequest, HttpResponse, Result, Transport, TransportError};

/// Default per-execution timeout, replays included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Transport that executes requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute http(s) URLs are used as-is so callers can reach other hosts
    /// through the same authenticated client.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else if error.is_body() || error.is_decode() {
            TransportError::Body(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

impl Transport for ReqwestTransport {
    fn id(&self) -> &str {
        "reqwest"
    }

    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let url = self.url_for(&request.path);
            debug!(method = %request.method, url = %url, "sending request");

            let mut builder = self
                .client
                .request(request.method, &url)
                .headers(request.headers)
                .timeout(self.timeout);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                let mapped = self.map_error(e);
                warn!(url = %url, error = %mapped, "request failed before a response arrived");
                mapped
            })?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| {
                let mapped = self.map_error(e);
                warn!(url = %url, error = %mapped, "failed to read response body");
                mapped
            })?;

            debug!(url = %url, status = status.as_u16(), bytes = body.len(), "response received");
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}
