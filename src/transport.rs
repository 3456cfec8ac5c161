//! HTTP-shaped request/response descriptors and the transport seam.
//!
//! The console core only ever talks to a [`Transport`]; [`HttpTransport`] is
//! the reqwest-backed implementation used by the binary.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Transport-level failure: nothing usable came back from the server.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid endpoint {0}: {1}")]
    Endpoint(String, String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
}

/// Outbound request: method, path relative to the service root, optional
/// JSON body, and the bearer credential attached by the session guard.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<SecretString>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
            bearer: None,
        }
    }
}

/// Raw response: status code and the unparsed body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401 and 403 are both treated as an invalidated session.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Executes a request against the remote service.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// reqwest-backed transport rooted at the service base url.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Endpoint paths resolve below `base_url`, keeping any path prefix it
    /// carries (`https://host/prefix` serves `/api/..` at `/prefix/api/..`).
    pub fn new(mut base_url: Url, timeout: Option<Duration>) -> Result<Self, TransportError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(APP_USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Endpoint(path.to_string(), e.to_string()))
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.path))]
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(&request.path)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
        }
        .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(status, bytes = body.len(), "response received");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_covers_401_and_403() {
        assert!(ApiResponse::new(401, "").is_unauthorized());
        assert!(ApiResponse::new(403, "").is_unauthorized());
        assert!(!ApiResponse::new(404, "").is_unauthorized());
        assert!(!ApiResponse::new(500, "").is_unauthorized());
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(ApiResponse::new(200, "").is_success());
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(301, "").is_success());
        assert!(!ApiResponse::new(500, "").is_success());
    }

    #[test]
    fn endpoint_keeps_query_string() {
        let base = Url::parse("https://example.test").unwrap();
        let transport = HttpTransport::new(base, None).unwrap();
        let url = transport
            .endpoint("/api/admin/transactions?limit=200")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/api/admin/transactions?limit=200"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        for base in ["https://example.test/prefix", "https://example.test/prefix/"] {
            let transport = HttpTransport::new(Url::parse(base).unwrap(), None).unwrap();
            let url = transport.endpoint("/api/admin/users").unwrap();
            assert_eq!(url.as_str(), "https://example.test/prefix/api/admin/users");
        }
    }
}
