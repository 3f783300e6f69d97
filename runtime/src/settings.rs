//! Application settings shared by the pipeline stages.
//!
//! Settings are loaded once from a persistent key-value store and written
//! back on every change.  Stages hold an [`AppSettings`] handle and call
//! [`AppSettings::current`] on each request, so a change made between two
//! requests is always observed by the second one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

/// Storage key the settings are persisted under.
pub const SETTINGS_KEY: &str = "app-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub use_cache: bool,
    /// Cache time-to-live in milliseconds.
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: u64,
    pub simulate_network_latency: bool,
    /// Simulated latency in milliseconds.
    pub network_latency: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl: 5 * 60 * 1000,
            simulate_network_latency: true,
            network_latency: 1000,
        }
    }
}

impl Settings {
    /// The latency to apply to emulated responses, zero when disabled.
    pub fn latency(&self) -> Duration {
        if self.simulate_network_latency {
            Duration::from_millis(self.network_latency)
        } else {
            Duration::ZERO
        }
    }
}

pub struct AppSettings {
    store: Arc<dyn KeyValueStore>,
    tx: watch::Sender<Settings>,
}

impl AppSettings {
    /// Load saved settings from `store`, falling back to defaults when
    /// nothing is saved or the saved value is unusable.  A value that is not
    /// JSON at all is removed; one that parses but lacks fields is left in
    /// place and replaced on the next save.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = saved_or_default(store.as_ref());
        let (tx, _rx) = watch::channel(initial);
        Self { store, tx }
    }

    /// Settings that are never read from storage.  Changes are still saved.
    pub fn with_settings(store: Arc<dyn KeyValueStore>, settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { store, tx }
    }

    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Apply `f` to the current settings and persist the result.  A failed
    /// save is logged; the new settings take effect regardless.
    pub fn update<F>(&self, f: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        self.tx.send_modify(f);
        let settings = self.current();
        if let Err(err) = self.save(&settings) {
            warn!(target: "table.settings", error = %err, "failed to save settings");
        }
        settings
    }

    pub fn replace(&self, settings: Settings) -> Settings {
        self.update(|s| *s = settings)
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let json = serde_json::to_string(settings).map_err(|source| StoreError::Serialization {
            key: SETTINGS_KEY.to_string(),
            source,
        })?;
        self.store.set(SETTINGS_KEY, json)
    }
}

fn saved_or_default(store: &dyn KeyValueStore) -> Settings {
    let Some(saved) = store.get(SETTINGS_KEY) else {
        return Settings::default();
    };
    let value: serde_json::Value = match serde_json::from_str(&saved) {
        Ok(value) => value,
        Err(err) => {
            warn!(target: "table.settings", error = %err, "removing unparsable saved settings");
            store.remove(SETTINGS_KEY);
            return Settings::default();
        }
    };
    match serde_json::from_value(value) {
        Ok(settings) => settings,
        Err(err) => {
            debug!(target: "table.settings", error = %err, "saved settings incomplete, using defaults");
            Settings::default()
        }
    }
}
