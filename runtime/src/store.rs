//! Minimal key-value storage capability used for the session cache and for
//! persisted settings.  Values are strings, as in browser web storage.

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota of {quota} bytes exceeded writing {key} ({needed} bytes needed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("failed to serialize value for {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

/// In-memory store living as long as the process, which is the session
/// scope of a runner.  An optional quota bounds the total size of keys plus
/// values; writes that would exceed it fail and leave the store unchanged.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    quota_bytes: Option<usize>,
    // Serializes quota check and insert for quota-bounded stores.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size of keys plus values, as counted against the quota.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.key().len() + e.value().len()).sum()
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key() != key)
            .map(|e| e.key().len() + e.value().len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let Some(quota) = self.quota_bytes else {
            self.entries.insert(key.to_string(), value);
            return Ok(());
        };

        let _guard = self.write_lock.lock();
        let needed = self.used_bytes_excluding(key) + key.len() + value.len();
        if needed > quota {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                quota,
            });
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
