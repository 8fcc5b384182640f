use serde::{Deserialize, Serialize};

/// Pagination parameters.
///
/// `sort` accepts `"column"` or `"column,asc"` / `"column,desc"`.
#[derive(Debug, Clone, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// The requested sort as `(column, ascending)`.
    pub fn sort_order(&self) -> Option<(&str, bool)> {
        let sort = self.sort.as_deref()?.trim();
        if sort.is_empty() {
            return None;
        }
        let (column, direction) = match sort.split_once(',') {
            Some((column, direction)) => (column.trim(), direction.trim()),
            None => (sort, "asc"),
        };
        Some((column, !direction.eq_ignore_ascii_case("desc")))
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages,
        }
    }
}
