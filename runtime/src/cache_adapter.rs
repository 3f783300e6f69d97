//! A caching adapter for GET requests.  Wraps another network adapter and
//! stores successful response bodies in a session key-value store, keyed by
//! the full request URL.  A stored entry is served without forwarding while
//! it is younger than the configured TTL.
//!
//! Expiry is lazy: an entry is only checked, and removed when stale or
//! malformed, when a request for its key arrives.  There is no size bound or
//! LRU eviction.  Concurrent misses for the same key may both forward and
//! both write; the last write wins.

use anyhow::Result;
use async_trait::async_trait;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::settings::AppSettings;
use crate::store::{KeyValueStore, StoreError};
use table_service::api::{NetworkAdapter, NetworkRequest, NetworkResponse};

pub const CACHE_KEY_PREFIX: &str = "http-cache-";

/// Status text of responses served from the cache.
pub const FROM_CACHE_STATUS_TEXT: &str = "OK (from cache)";

/// Persisted form of a cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Epoch milliseconds at which the response was stored.
    pub timestamp: i64,
    pub data: Value,
}

/// State of a single key as observed by a read.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Empty,
    Fresh(CacheEntry),
    Expired,
    Malformed,
}

/// Storage key for a request URL.  The URL must include its query string.
pub fn cache_key(url: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, url)
}

/// Classify a raw stored value at time `now` against `ttl_millis`.
pub fn classify(raw: Option<&str>, now: i64, ttl_millis: u64) -> EntryState {
    let Some(raw) = raw else {
        return EntryState::Empty;
    };
    let entry: CacheEntry = match serde_json::from_str(raw) {
        Ok(entry) => entry,
        Err(_) => return EntryState::Malformed,
    };
    let age = now.saturating_sub(entry.timestamp);
    if age < 0 || (age as u64) < ttl_millis {
        EntryState::Fresh(entry)
    } else {
        EntryState::Expired
    }
}

pub struct CacheAdapter {
    inner: Box<dyn NetworkAdapter>,
    store: Arc<dyn KeyValueStore>,
    settings: Arc<AppSettings>,
    clock: Arc<dyn Clock>,
}

impl CacheAdapter {
    pub fn new(
        inner: Box<dyn NetworkAdapter>,
        store: Arc<dyn KeyValueStore>,
        settings: Arc<AppSettings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { inner, store, settings, clock }
    }

    fn lookup(&self, key: &str, ttl_millis: u64) -> Option<CacheEntry> {
        let raw = self.store.get(key);
        match classify(raw.as_deref(), self.clock.now_millis(), ttl_millis) {
            EntryState::Empty => None,
            EntryState::Fresh(entry) => Some(entry),
            EntryState::Expired => {
                debug!(target: "table.cache", key, "removing expired entry");
                self.store.remove(key);
                None
            }
            EntryState::Malformed => {
                warn!(target: "table.cache", key, "removing malformed entry");
                self.store.remove(key);
                None
            }
        }
    }

    fn store_response(&self, key: &str, resp: &NetworkResponse) -> Result<(), StoreError> {
        let entry = CacheEntry {
            timestamp: self.clock.now_millis(),
            data: resp.body.clone(),
        };
        let json = serde_json::to_string(&entry).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, json)
    }
}

#[async_trait]
impl NetworkAdapter for CacheAdapter {
    async fn fetch(&self, request: &NetworkRequest) -> Result<NetworkResponse> {
        if request.method != Method::GET {
            return self.inner.fetch(request).await;
        }
        let settings = self.settings.current();
        if !settings.use_cache {
            return self.inner.fetch(request).await;
        }

        let key = cache_key(&request.url);
        if let Some(entry) = self.lookup(&key, settings.cache_ttl) {
            info!(target: "table.cache", url = %request.url, "serving from cache");
            return Ok(NetworkResponse::ok(request.url.clone(), entry.data)
                .with_status_text(FROM_CACHE_STATUS_TEXT));
        }

        // Nothing is written unless the forwarded response actually arrives.
        let resp = self.inner.fetch(request).await?;
        if resp.is_success() {
            if let Err(err) = self.store_response(&key, &resp) {
                warn!(target: "table.cache", url = %request.url, error = %err, "failed to store cache entry");
            }
        }
        Ok(resp)
    }
}
