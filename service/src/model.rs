use serde::{Deserialize, Serialize};

/// A single table row.  Only the sortable and searchable fields matter to
/// the pipeline; `tags` is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub in_stock: bool,
    pub quantity: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One page of table data.  `total` is the number of rows matching the
/// filter before pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableResponse {
    pub total: usize,
    pub items: Vec<TableItem>,
}
