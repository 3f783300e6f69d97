//! Command line runner for the table pipeline.
//!
//! Builds the request URL from the given sort, page and filter options, sends
//! it through the composed pipeline (cache, fake server, host fetch) one or
//! more times and writes one JSON line per response to stdout.  Logs go to
//! stderr and are filtered with `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use network_adapter::HostFetch;
use table_runtime::cache_adapter::FROM_CACHE_STATUS_TEXT;
use table_runtime::{AdapterManager, AppSettings, MemoryStore, PipelineContext};
use table_service::api::{NetworkAdapter, NetworkRequest};
use table_service::{load_dataset, SortDirection, SortField, TableResponse, TableState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Query the table data pipeline")]
struct Args {
    /// Table resource URL, without query string
    #[arg(long, default_value = "https://example.com/table.json")]
    url: String,

    /// Serve the table resource from this JSON dataset instead of the network
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Field to sort by (id, name, description, price, inStock, quantity)
    #[arg(long, default_value = "id")]
    sort: String,

    /// Sort direction (asc or desc)
    #[arg(long, default_value = "asc")]
    direction: String,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Rows per page
    #[arg(long, default_value_t = 5)]
    page_size: usize,

    /// Case-insensitive search over name and description
    #[arg(long, default_value = "")]
    filter: String,

    /// Disable the response cache
    #[arg(long)]
    no_cache: bool,

    /// Cache time-to-live in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// Simulated network latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Disable simulated network latency
    #[arg(long)]
    no_latency: bool,

    /// Send the same request this many times
    #[arg(long, default_value_t = 1)]
    repeat: usize,
}

impl Args {
    fn table_state(&self) -> TableState {
        let mut state = TableState::new();
        state.filter_change(self.filter.clone());
        state.sort_change(
            SortField::parse(&self.sort).unwrap_or_default(),
            SortDirection::parse(&self.direction).unwrap_or_default(),
        );
        state.page_change(self.page, self.page_size);
        state
    }

    fn settings(&self) -> Arc<AppSettings> {
        let settings = Arc::new(AppSettings::load(Arc::new(MemoryStore::new())));
        settings.update(|s| {
            if self.no_cache {
                s.use_cache = false;
            }
            if let Some(ttl) = self.ttl_ms {
                s.cache_ttl = ttl;
            }
            if let Some(latency) = self.latency_ms {
                s.simulate_network_latency = true;
                s.network_latency = latency;
            }
            if self.no_latency {
                s.simulate_network_latency = false;
            }
        });
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut ctx = PipelineContext::new(args.settings());
    if let Some(path) = &args.fixture {
        let dataset = load_dataset(path)?;
        info!(path = %path.display(), rows = dataset.len(), "loaded dataset fixture");
        ctx = ctx.with_dataset(dataset);
    }
    let pipeline = AdapterManager::new(Box::new(HostFetch::new()), "host-fetch", &ctx);
    info!(pipeline = %pipeline.binding.impl_name, "pipeline ready");

    let url = args.table_state().resource_url(&args.url);
    let request = NetworkRequest::get(url.clone());
    for attempt in 1..=args.repeat {
        let resp = pipeline.fetch(&request).await?;
        let page: TableResponse = serde_json::from_value(resp.body)
            .with_context(|| format!("{} returned an unexpected body", url))?;
        let line = json!({
            "attempt": attempt,
            "status": resp.status,
            "fromCache": resp.status_text == FROM_CACHE_STATUS_TEXT,
            "total": page.total,
            "items": page.items,
        });
        println!("{}", line);
    }
    Ok(())
}
