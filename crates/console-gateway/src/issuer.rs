//! Request issuing
//!
//! `RequestIssuer` is the seam between the gateway and the network. The
//! gateway decides which credentials go on a request; the issuer only sends
//! what it is given and buffers the response. `HttpIssuer` is the reqwest
//! implementation used against the real backend.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::error::NetworkError;
use crate::request::{ApiRequest, ApiResponse};

/// Boxed future returned by `RequestIssuer::issue`.
pub type IssueFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, NetworkError>> + Send + 'a>>;

/// Sends a single HTTP request to the backend.
///
/// Any HTTP status, including 401, is a successful issue. Only transport
/// failures (connect, timeout, body read) are errors.
pub trait RequestIssuer: Send + Sync {
    fn issue<'a>(&'a self, request: &'a ApiRequest) -> IssueFuture<'a>;
}

/// reqwest-backed issuer rooted at the back-office base URL.
#[derive(Clone)]
pub struct HttpIssuer {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIssuer {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the base URL and a request path (query string included).
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

impl RequestIssuer for HttpIssuer {
    fn issue<'a>(&'a self, request: &'a ApiRequest) -> IssueFuture<'a> {
        Box::pin(async move {
            let url = self.url(&request.path);
            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .headers(request.headers.clone())
                .timeout(self.timeout);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    NetworkError(format!("{} {url} timed out after {:?}", request.method, self.timeout))
                } else {
                    NetworkError(format!("{} {url} failed: {e}", request.method))
                }
            })?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| NetworkError(format!("reading response body from {url}: {e}")))?;

            debug!(%status, bytes = body.len(), "backend responded");
            Ok(ApiResponse {
                status,
                headers,
                body,
            })
        })
    }
}
