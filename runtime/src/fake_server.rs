//! A pipeline stage emulating server-side pagination, sorting and filtering
//! of the table resource using the request's query parameters.  Requests for
//! any other resource pass through untouched.
//!
//! With a fixture dataset the stage answers without forwarding.  Without one
//! it forwards the request and treats a successful response body as the
//! dataset to page over.  Either way the emulated response is delayed by the
//! configured network latency; errors are not delayed.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::settings::AppSettings;
use table_service::api::{NetworkAdapter, NetworkRequest, NetworkResponse};
use table_service::model::TableItem;
use table_service::{dataset_from_value, emulate_server_response, is_table_resource, QueryParams};

enum Upstream {
    Dataset(Vec<TableItem>),
    Unsuccessful(NetworkResponse),
}

pub struct FakeServer {
    inner: Box<dyn NetworkAdapter>,
    settings: Arc<AppSettings>,
    dataset: Option<Arc<Vec<TableItem>>>,
}

impl FakeServer {
    /// Emulate over whatever the inner adapter returns for the resource.
    pub fn new(inner: Box<dyn NetworkAdapter>, settings: Arc<AppSettings>) -> Self {
        Self { inner, settings, dataset: None }
    }

    /// Emulate over a fixed dataset; the inner adapter only sees requests
    /// for other resources.
    pub fn with_dataset(
        inner: Box<dyn NetworkAdapter>,
        settings: Arc<AppSettings>,
        dataset: Arc<Vec<TableItem>>,
    ) -> Self {
        Self { inner, settings, dataset: Some(dataset) }
    }

    async fn upstream_dataset(&self, request: &NetworkRequest) -> Result<Upstream> {
        let resp = self.inner.fetch(request).await?;
        if !resp.is_success() {
            return Ok(Upstream::Unsuccessful(resp));
        }
        let items = dataset_from_value(&resp.body)
            .map_err(|err| anyhow!("{} did not return a table dataset: {}", request.url, err))?;
        Ok(Upstream::Dataset(items))
    }
}

#[async_trait]
impl NetworkAdapter for FakeServer {
    async fn fetch(&self, request: &NetworkRequest) -> Result<NetworkResponse> {
        if !is_table_resource(&request.url) {
            return self.inner.fetch(request).await;
        }

        // Read per request so that settings changes apply immediately.
        let latency = self.settings.current().latency();
        let query = QueryParams::from_url(&request.url);

        let page = match &self.dataset {
            Some(items) => emulate_server_response(items, &query),
            None => match self.upstream_dataset(request).await? {
                Upstream::Dataset(items) => emulate_server_response(&items, &query),
                Upstream::Unsuccessful(unsuccessful) => {
                    delay(latency).await;
                    return Ok(unsuccessful);
                }
            },
        };
        debug!(
            target: "table.fake_server",
            url = %request.url,
            total = page.total,
            returned = page.items.len(),
            latency_ms = latency.as_millis() as u64,
            "emulated table response"
        );

        let body = serde_json::to_value(&page)?;
        delay(latency).await;
        Ok(NetworkResponse::ok(request.url.clone(), body))
    }
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
