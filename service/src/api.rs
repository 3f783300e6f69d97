use anyhow::{anyhow, Result};
use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Trait representing one stage of the request pipeline.  The innermost stage
/// is the transport (a host fetch); every other stage wraps a boxed inner
/// adapter and decides whether to forward, short-circuit or rewrite the
/// response.  Failures from the inner stage must be propagated unchanged.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
    async fn fetch(&self, request: &NetworkRequest) -> Result<NetworkResponse>;
}

/// An outgoing request.  `url` always carries the full query string, so it
/// identifies the resource completely.
#[derive(Debug, Clone)]
pub struct NetworkRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl NetworkRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Response returned by a pipeline stage.  The body is kept as parsed JSON so
/// that caching and server emulation can work on it without re-parsing; a
/// transport receiving a non-JSON payload stores it as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResponse {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl NetworkResponse {
    /// A `200 OK` response carrying `body`.
    pub fn ok(url: impl Into<String>, body: Value) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            url: url.into(),
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Any 2xx status counts as success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetch a JSON document through `adapter` and deserialize the body into `T`.
/// Non-success statuses are reported as errors carrying the status code.
pub async fn fetch_json<A, T>(adapter: &A, request: &NetworkRequest) -> Result<(u16, T)>
where
    A: NetworkAdapter + ?Sized,
    T: DeserializeOwned,
{
    let resp = adapter.fetch(request).await?;
    if !resp.is_success() {
        return Err(anyhow!("{} {}: status {}", request.method, request.url, resp.status));
    }
    let status = resp.status;
    let value: T = serde_json::from_value(resp.body)?;
    Ok((status, value))
}
