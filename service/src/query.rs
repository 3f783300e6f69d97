//! Sort, filter and pagination parameters as they travel in a request URL.
//!
//! The same parameter set is used on both sides of the pipeline: the server
//! emulation parses it from the request it intercepts, and the table client
//! keeps it as shareable URL state and renders it into the request URL.

use std::num::IntErrorKind;
use url::form_urlencoded;

/// Page size assumed by the server when the request does not name one.
pub const SERVER_PAGE_SIZE: usize = 20;

/// Page size the table client starts with.
pub const CLIENT_PAGE_SIZE: usize = 5;

/// Record fields a page can be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Description,
    Price,
    InStock,
    Quantity,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "description" => Some(Self::Description),
            "price" => Some(Self::Price),
            "inStock" => Some(Self::InStock),
            "quantity" => Some(Self::Quantity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::InStock => "inStock",
            Self::Quantity => "quantity",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Parsed `sortActive`, `sortDirection`, `pageIndex`, `pageSize` and `filter`
/// query parameters.  Construction never fails: every missing or invalid
/// value is replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub sort_active: SortField,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: usize,
    pub filter: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::with_page_size(SERVER_PAGE_SIZE)
    }
}

impl QueryParams {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            sort_active: SortField::default(),
            sort_direction: SortDirection::default(),
            page_index: 0,
            page_size,
            filter: String::new(),
        }
    }

    /// Parse the query string of a full or relative URL using the server
    /// defaults.  A URL without a query string yields the defaults.
    pub fn from_url(url: &str) -> Self {
        Self::from_query(query_part(url), SERVER_PAGE_SIZE)
    }

    /// Parse a bare query string (without the leading `?`).  Only the first
    /// occurrence of each parameter counts, and an empty value is treated as
    /// absent.
    pub fn from_query(query: &str, default_page_size: usize) -> Self {
        let mut params = Self::with_page_size(default_page_size);
        let mut seen: Vec<String> = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if seen.iter().any(|k| *k == key) {
                continue;
            }
            seen.push(key.to_string());
            if value.is_empty() {
                continue;
            }
            match &*key {
                "sortActive" => {
                    params.sort_active = SortField::parse(&value).unwrap_or_default();
                }
                "sortDirection" => {
                    params.sort_direction = SortDirection::parse(&value).unwrap_or_default();
                }
                "pageIndex" => {
                    if let Some(index) = parse_count(&value) {
                        params.page_index = index;
                    }
                }
                "pageSize" => {
                    match parse_count(&value) {
                        Some(size) if size > 0 => params.page_size = size,
                        _ => {}
                    }
                }
                "filter" => params.filter = value.into_owned(),
                _ => {}
            }
        }
        params
    }

    /// Render all five parameters, always in the same order, so that equal
    /// parameter sets produce byte-identical URLs (and cache keys).
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("sortActive", self.sort_active.as_str())
            .append_pair("sortDirection", self.sort_direction.as_str())
            .append_pair("pageIndex", &self.page_index.to_string())
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("filter", &self.filter)
            .finish()
    }
}

/// A non-negative integer.  Values too large for `usize` saturate, so an
/// enormous page index still lands past the end of the data.
fn parse_count(value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(usize::MAX),
        Err(_) => None,
    }
}

fn query_part(url: &str) -> &str {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    without_fragment
        .split_once('?')
        .map_or("", |(_, query)| query)
}

/// Table state shared through the page URL.  Each user interaction merges a
/// partial update into the current parameters; changing the filter always
/// returns to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    params: QueryParams,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new()
    }
}

impl TableState {
    pub fn new() -> Self {
        Self {
            params: QueryParams::with_page_size(CLIENT_PAGE_SIZE),
        }
    }

    /// Restore state from a shared URL's query string.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            params: QueryParams::from_query(query, CLIENT_PAGE_SIZE),
        }
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn sort_change(&mut self, active: SortField, direction: SortDirection) {
        self.params.sort_active = active;
        self.params.sort_direction = direction;
    }

    pub fn page_change(&mut self, page_index: usize, page_size: usize) {
        self.params.page_index = page_index;
        if page_size > 0 {
            self.params.page_size = page_size;
        }
    }

    pub fn filter_change(&mut self, filter: impl Into<String>) {
        self.params.page_index = 0;
        self.params.filter = filter.into();
    }

    /// The data request URL for the current state, e.g.
    /// `https://host/table.json?sortActive=id&...`.
    pub fn resource_url(&self, base: &str) -> String {
        format!("{}?{}", base, self.params.to_query_string())
    }
}
