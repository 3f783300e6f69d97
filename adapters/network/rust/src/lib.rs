//! Host network adapter implementation.  This crate provides a `HostFetch`
//! struct implementing the `NetworkAdapter` trait defined in the service
//! crate.  It is the innermost stage of the pipeline and the only one that
//! opens connections; it uses `reqwest` and does no caching or retrying of
//! its own.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use table_service::api::{NetworkAdapter, NetworkRequest, NetworkResponse};
use tracing::debug;

pub struct HostFetch {
    client: reqwest::Client,
}

impl Default for HostFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl HostFetch {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl NetworkAdapter for HostFetch {
    async fn fetch(&self, request: &NetworkRequest) -> Result<NetworkResponse> {
        // reqwest and the service crate share the same `http` version.
        let mut req = self.client.request(request.method.clone(), &request.url);
        for (k, v) in &request.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send().await?;

        let status = resp.status();
        let mut headers = HashMap::new();
        for (k, v) in resp.headers().iter() {
            let val = v.to_str().unwrap_or("").to_string();
            headers.insert(k.to_string(), val);
        }
        let url = resp.url().to_string();
        let text = resp.text().await?;
        debug!(target: "table.host_fetch", url = %url, status = status.as_u16(), bytes = text.len(), "fetched");

        // Non-JSON payloads are kept verbatim as a JSON string.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(NetworkResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests;
