//! Runtime for the table data pipeline.  This crate provides the stateful
//! pipeline stages (response cache and fake server), the settings
//! collaborator they read on every request, the key-value storage they
//! persist into, and the adapter manager that composes them around a
//! transport.

pub mod adapter_manager;
pub mod cache_adapter;
pub mod clock;
pub mod fake_server;
pub mod settings;
pub mod store;

pub use adapter_manager::{AdapterBinding, AdapterManager, PipelineContext};
pub use cache_adapter::{cache_key, CacheAdapter, CacheEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fake_server::FakeServer;
pub use settings::{AppSettings, Settings};
pub use store::{KeyValueStore, MemoryStore, StoreError};
