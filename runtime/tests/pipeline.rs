use anyhow::anyhow;
use async_trait::async_trait;
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use table_runtime::{
    cache_key, AdapterManager, AppSettings, CacheAdapter, CacheEntry, KeyValueStore, ManualClock, MemoryStore,
    PipelineContext, Settings,
};
use table_service::api::{NetworkAdapter, NetworkRequest, NetworkResponse};
use table_service::model::{TableItem, TableResponse};

const TTL: u64 = 1000;
const T0: i64 = 1_700_000_000_000;

// Transport answering `{"n": <call number>}` so that a stale payload can be
// told apart from a fresh one.
#[derive(Default)]
struct CountingTransport {
    calls: Arc<AtomicUsize>,
    status: Option<u16>,
    fail: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl NetworkAdapter for CountingTransport {
    async fn fetch(&self, request: &NetworkRequest) -> anyhow::Result<NetworkResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("network unreachable"));
        }
        let mut resp = NetworkResponse::ok(request.url.clone(), json!({ "n": n }));
        if let Some(status) = self.status {
            resp.status = status;
        }
        Ok(resp)
    }
}

struct Harness {
    cache: CacheAdapter,
    calls: Arc<AtomicUsize>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    settings: Arc<AppSettings>,
}

fn harness_with(transport: CountingTransport, store: MemoryStore) -> Harness {
    let calls = transport.calls.clone();
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::new(T0));
    let settings = Arc::new(AppSettings::with_settings(
        Arc::new(MemoryStore::new()),
        Settings {
            use_cache: true,
            cache_ttl: TTL,
            simulate_network_latency: false,
            network_latency: 0,
        },
    ));
    let cache = CacheAdapter::new(Box::new(transport), store.clone(), settings.clone(), clock.clone());
    Harness { cache, calls, store, clock, settings }
}

fn harness() -> Harness {
    harness_with(CountingTransport::default(), MemoryStore::new())
}

const URL: &str = "https://example.com/table.json?sortActive=id&sortDirection=asc&pageIndex=0&pageSize=5&filter=";

#[tokio::test]
async fn fresh_entry_is_served_until_ttl_elapses() {
    let h = harness();
    let req = NetworkRequest::get(URL);

    let first = h.cache.fetch(&req).await.unwrap();
    assert_eq!(first.body, json!({ "n": 1 }));

    h.clock.set(T0 + TTL as i64 - 1);
    let hit = h.cache.fetch(&req).await.unwrap();
    assert_eq!(hit.body, json!({ "n": 1 }));
    assert_eq!(hit.status, 200);
    assert_eq!(hit.status_text, "OK (from cache)");
    assert_eq!(hit.url, URL);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    h.clock.set(T0 + TTL as i64 + 1);
    let refetched = h.cache.fetch(&req).await.unwrap();
    assert_eq!(refetched.body, json!({ "n": 2 }));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn entry_at_exactly_ttl_is_expired() {
    let h = harness();
    let req = NetworkRequest::get(URL);
    h.cache.fetch(&req).await.unwrap();
    h.clock.advance(TTL as i64);
    h.cache.fetch(&req).await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stored_entry_has_timestamp_and_data() {
    let h = harness();
    h.cache.fetch(&NetworkRequest::get(URL)).await.unwrap();
    let raw = h.store.get(&format!("http-cache-{}", URL)).expect("entry stored");
    let entry: CacheEntry = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.timestamp, T0);
    assert_eq!(entry.data, json!({ "n": 1 }));
}

#[tokio::test]
async fn expired_refetch_overwrites_entry() {
    let h = harness();
    let req = NetworkRequest::get(URL);
    h.cache.fetch(&req).await.unwrap();
    h.clock.advance(TTL as i64 * 2);
    h.cache.fetch(&req).await.unwrap();
    let entry: CacheEntry = serde_json::from_str(&h.store.get(&cache_key(URL)).unwrap()).unwrap();
    assert_eq!(entry.timestamp, T0 + TTL as i64 * 2);
    assert_eq!(entry.data, json!({ "n": 2 }));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn urls_differing_by_one_parameter_do_not_collide() {
    let h = harness();
    let a = NetworkRequest::get("https://example.com/table.json?pageIndex=0");
    let b = NetworkRequest::get("https://example.com/table.json?pageIndex=1");
    assert_eq!(h.cache.fetch(&a).await.unwrap().body, json!({ "n": 1 }));
    assert_eq!(h.cache.fetch(&b).await.unwrap().body, json!({ "n": 2 }));
    assert_eq!(h.cache.fetch(&a).await.unwrap().body, json!({ "n": 1 }));
    assert_eq!(h.cache.fetch(&b).await.unwrap().body, json!({ "n": 2 }));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn disabled_cache_forwards_every_request() {
    let h = harness();
    h.settings.update(|s| s.use_cache = false);
    let req = NetworkRequest::get(URL);
    h.cache.fetch(&req).await.unwrap();
    h.cache.fetch(&req).await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn settings_are_rechecked_on_every_request() {
    let h = harness();
    let req = NetworkRequest::get(URL);
    h.cache.fetch(&req).await.unwrap();

    h.settings.update(|s| s.use_cache = false);
    assert_eq!(h.cache.fetch(&req).await.unwrap().body, json!({ "n": 2 }));

    h.settings.update(|s| s.use_cache = true);
    // The entry written while caching was on is still fresh.
    assert_eq!(h.cache.fetch(&req).await.unwrap().body, json!({ "n": 1 }));

    h.settings.update(|s| s.cache_ttl = 1);
    h.clock.advance(5);
    assert_eq!(h.cache.fetch(&req).await.unwrap().body, json!({ "n": 3 }));
}

#[tokio::test]
async fn non_get_requests_bypass_the_cache() {
    let h = harness();
    let req = NetworkRequest::new(Method::POST, URL);
    h.cache.fetch(&req).await.unwrap();
    h.cache.fetch(&req).await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert!(h.store.is_empty());

    // A POST never reads a GET's entry either.
    h.cache.fetch(&NetworkRequest::get(URL)).await.unwrap();
    assert_eq!(h.cache.fetch(&req).await.unwrap().body, json!({ "n": 4 }));
}

#[tokio::test]
async fn malformed_entries_are_dropped_and_refetched() {
    for raw in ["not json", r#"{"timestamp":"soon","data":{}}"#, r#"{"data":{}}"#, r#"{"timestamp":1}"#] {
        let h = harness();
        h.store.set(&cache_key(URL), raw.to_string()).unwrap();
        let resp = h.cache.fetch(&NetworkRequest::get(URL)).await.unwrap();
        assert_eq!(resp.body, json!({ "n": 1 }), "entry {}", raw);
        let entry: CacheEntry = serde_json::from_str(&h.store.get(&cache_key(URL)).unwrap()).unwrap();
        assert_eq!(entry.timestamp, T0);
    }
}

#[tokio::test]
async fn storage_failure_still_returns_response() {
    let h = harness_with(CountingTransport::default(), MemoryStore::with_quota(16));
    let req = NetworkRequest::get(URL);
    let resp = h.cache.fetch(&req).await.unwrap();
    assert_eq!(resp.body, json!({ "n": 1 }));
    assert!(h.store.is_empty());

    // Later requests keep working and keep forwarding.
    let resp = h.cache.fetch(&req).await.unwrap();
    assert_eq!(resp.body, json!({ "n": 2 }));
}

#[tokio::test]
async fn forwarding_failures_propagate_and_are_not_cached() {
    let transport = CountingTransport { fail: true, ..Default::default() };
    let h = harness_with(transport, MemoryStore::new());
    let err = h.cache.fetch(&NetworkRequest::get(URL)).await.unwrap_err();
    assert_eq!(err.to_string(), "network unreachable");
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn unsuccessful_responses_are_not_cached() {
    let transport = CountingTransport { status: Some(503), ..Default::default() };
    let h = harness_with(transport, MemoryStore::new());
    let resp = h.cache.fetch(&NetworkRequest::get(URL)).await.unwrap();
    assert_eq!(resp.status, 503);
    assert!(h.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn abandoned_request_writes_nothing() {
    let transport = CountingTransport { delay: Some(Duration::from_secs(5)), ..Default::default() };
    let h = harness_with(transport, MemoryStore::new());
    let req = NetworkRequest::get(URL);
    let res = tokio::time::timeout(Duration::from_secs(1), h.cache.fetch(&req)).await;
    assert!(res.is_err());
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert!(h.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_both_forward_and_last_write_wins() {
    let transport = CountingTransport { delay: Some(Duration::from_millis(10)), ..Default::default() };
    let h = harness_with(transport, MemoryStore::new());
    let req = NetworkRequest::get(URL);
    let (a, b) = tokio::join!(h.cache.fetch(&req), h.cache.fetch(&req));
    let bodies = [a.unwrap().body, b.unwrap().body];
    assert!(bodies.contains(&json!({ "n": 1 })));
    assert!(bodies.contains(&json!({ "n": 2 })));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.len(), 1);
}

fn numbered(n: u64) -> Vec<TableItem> {
    (1..=n)
        .map(|id| TableItem {
            id,
            name: format!("Product {}", id),
            description: "sample product".to_string(),
            price: 10.0 + id as f64,
            in_stock: id % 2 == 0,
            quantity: id,
            tags: vec!["sample".to_string()],
        })
        .collect()
}

fn pipeline(dataset: Vec<TableItem>) -> (AdapterManager, Arc<AtomicUsize>) {
    let transport = CountingTransport::default();
    let calls = transport.calls.clone();
    let settings = Arc::new(AppSettings::with_settings(
        Arc::new(MemoryStore::new()),
        Settings { simulate_network_latency: false, ..Settings::default() },
    ));
    let ctx = PipelineContext::new(settings).with_dataset(dataset);
    (AdapterManager::new(Box::new(transport), "counting", &ctx), calls)
}

async fn page(mgr: &AdapterManager, url: &str) -> TableResponse {
    let resp = mgr.fetch(&NetworkRequest::get(url)).await.unwrap();
    serde_json::from_value::<TableResponse>(resp.body).unwrap()
}

#[tokio::test]
async fn pipeline_serves_descending_first_page() {
    let (mgr, calls) = pipeline(numbered(25));
    let resp = page(&mgr, "https://example.com/table.json?sortActive=id&sortDirection=desc&pageIndex=0&pageSize=10").await;
    assert_eq!(resp.total, 25);
    assert_eq!(resp.items.iter().map(|i| i.id).collect::<Vec<_>>(), (16..=25).rev().collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pipeline_filter_without_matches() {
    let (mgr, _) = pipeline(numbered(25));
    let resp = page(&mgr, "https://example.com/table.json?filter=abc").await;
    assert_eq!(resp, TableResponse::default());
}

#[tokio::test]
async fn pipeline_forwards_other_resources_and_caches_them() {
    let (mgr, calls) = pipeline(numbered(3));
    let req = NetworkRequest::get("https://example.com/api/issues?state=open");
    let first = mgr.fetch(&req).await.unwrap();
    let second = mgr.fetch(&req).await.unwrap();
    assert_eq!(first.body, second.body);
    assert_eq!(second.status_text, "OK (from cache)");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_page_matches_emulated_page() {
    let (mgr, _) = pipeline(numbered(25));
    let url = "https://example.com/table.json?sortActive=price&sortDirection=desc&pageIndex=1&pageSize=4";
    let fresh: Value = mgr.fetch(&NetworkRequest::get(url)).await.unwrap().body;
    let cached = mgr.fetch(&NetworkRequest::get(url)).await.unwrap();
    assert_eq!(cached.status_text, "OK (from cache)");
    assert_eq!(cached.body, fresh);
    assert_eq!(fresh["items"][0]["id"], 21);
}
