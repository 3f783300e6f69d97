//! Server-side table processing: filter, then sort, then paginate.

use std::cmp::Ordering;
use std::ops::Range;

use crate::model::{TableItem, TableResponse};
use crate::query::{QueryParams, SortDirection, SortField};

/// Compute one page of `items` for `query`.  The result depends only on the
/// inputs; calling it twice with the same arguments yields equal pages.
pub fn emulate_server_response(items: &[TableItem], query: &QueryParams) -> TableResponse {
    let mut matched = filter_items(items, &query.filter);
    // There is no pagination without a defined order, so always sort.
    sort_items(&mut matched, query.sort_active, query.sort_direction);

    let total = matched.len();
    let range = page_range(total, query.page_index, query.page_size);
    let items = matched[range].iter().map(|item| (*item).clone()).collect();
    TableResponse { total, items }
}

/// Rows whose name or description contains `filter`, ignoring case.  An empty
/// filter keeps every row.
pub fn filter_items<'a>(items: &'a [TableItem], filter: &str) -> Vec<&'a TableItem> {
    if filter.is_empty() {
        return items.iter().collect();
    }
    let needle = filter.to_lowercase();
    items
        .iter()
        .filter(|item| matches_filter(item, &needle))
        .collect()
}

/// `needle` must already be lowercase.
pub fn matches_filter(item: &TableItem, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle) || item.description.to_lowercase().contains(needle)
}

/// Stable sort by `field`; equal rows keep their dataset order.
pub fn sort_items(items: &mut [&TableItem], field: SortField, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ord = compare_by(a, b, field);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

pub fn compare_by(a: &TableItem, b: &TableItem, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Description => a.description.cmp(&b.description),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::InStock => a.in_stock.cmp(&b.in_stock),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
    }
}

/// `[page_index * page_size, + page_size)` clamped to `len`.  Pages past the
/// end are empty rather than an error.
pub fn page_range(len: usize, page_index: usize, page_size: usize) -> Range<usize> {
    let start = page_index.saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    start..end
}
