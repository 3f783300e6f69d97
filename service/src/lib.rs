//! Core logic for the table data pipeline.  This crate contains the adapter
//! seam shared by every pipeline stage plus pure functions that do not depend
//! on timers, storage or host capabilities: query parsing, server emulation
//! and dataset loading.  The runtime crate composes the stateful stages
//! (cache, fake server, settings) around these functions.

pub mod api;
pub mod emulate;
pub mod loader;
pub mod model;
pub mod query;

pub use api::{fetch_json, NetworkAdapter, NetworkRequest, NetworkResponse};
pub use emulate::emulate_server_response;
pub use loader::{dataset_from_value, load_dataset, LoadError};
pub use model::{TableItem, TableResponse};
pub use query::{QueryParams, SortDirection, SortField, TableState};

/// Logical resource served by the fake server.  Matched as a substring of
/// the request URL.
pub const TABLE_RESOURCE: &str = "/table.json";

/// Whether `url` addresses the emulated table resource.
pub fn is_table_resource(url: &str) -> bool {
    url.contains(TABLE_RESOURCE)
}
