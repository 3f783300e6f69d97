use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::cache_adapter::CacheAdapter;
use crate::clock::{Clock, SystemClock};
use crate::fake_server::FakeServer;
use crate::settings::AppSettings;
use crate::store::{KeyValueStore, MemoryStore};
use table_service::api::{NetworkAdapter, NetworkRequest, NetworkResponse};
use table_service::model::TableItem;

/// Records which stages were composed around which transport, outermost
/// first, e.g. `cache-fake-server-host-fetch`.
#[derive(Debug, Clone)]
pub struct AdapterBinding {
    pub impl_name: String,
}

/// Collaborators the pipeline stages share.
pub struct PipelineContext {
    pub settings: Arc<AppSettings>,
    /// Session-scoped store backing the response cache.
    pub session: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    /// Fixture served by the fake server.  `None` pages over the transport's
    /// response for the table resource instead.
    pub dataset: Option<Arc<Vec<TableItem>>>,
}

impl PipelineContext {
    /// Fresh in-memory session, system clock, no fixture.
    pub fn new(settings: Arc<AppSettings>) -> Self {
        Self {
            settings,
            session: Arc::new(MemoryStore::new()),
            clock: Arc::new(SystemClock),
            dataset: None,
        }
    }

    pub fn with_dataset(mut self, dataset: Vec<TableItem>) -> Self {
        self.dataset = Some(Arc::new(dataset));
        self
    }
}

/// Composes the request pipeline around a transport.  The cache is the
/// outermost stage, so a fresh hit skips both the fake server and the
/// transport; the fake server sits directly on the transport.
pub struct AdapterManager {
    adapter: Box<dyn NetworkAdapter>,
    pub binding: AdapterBinding,
}

impl AdapterManager {
    pub fn new(transport: Box<dyn NetworkAdapter>, transport_name: &str, ctx: &PipelineContext) -> Self {
        let fake_server = match &ctx.dataset {
            Some(dataset) => FakeServer::with_dataset(transport, ctx.settings.clone(), dataset.clone()),
            None => FakeServer::new(transport, ctx.settings.clone()),
        };
        let adapter: Box<dyn NetworkAdapter> = Box::new(CacheAdapter::new(
            Box::new(fake_server),
            ctx.session.clone(),
            ctx.settings.clone(),
            ctx.clock.clone(),
        ));
        let binding = AdapterBinding {
            impl_name: format!("cache-fake-server-{}", transport_name),
        };
        debug!(target: "table.pipeline", impl_name = %binding.impl_name, "pipeline composed");
        Self { adapter, binding }
    }
}

#[async_trait]
impl NetworkAdapter for AdapterManager {
    async fn fetch(&self, request: &NetworkRequest) -> Result<NetworkResponse> {
        self.adapter.fetch(request).await
    }
}
