//! Shared pagination utilities
//!
//! Common pagination types used by list queries. Two paging strategies are
//! supported: offset paging (`page`) and cursor paging (`page_after`); the
//! helpers here cover the parts common to both.

use serde::{Deserialize, Serialize};

/// Maximum (and default) number of items per page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset-mode pagination request parameters
///
/// `page` is 1-indexed and floored at 1; `page_size` defaults to
/// [`MAX_PAGE_SIZE`] and is clamped to 1..=[`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self { page, page_size }
    }

    /// Page number (1-indexed), floored at 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Items per page, defaulted and clamped
    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset for the SQL OFFSET clause
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// Pagination metadata attached to list responses
///
/// `total` is the count of records matching the filter set, independent of
/// the page window. `next_page_after` carries the cursor for the following
/// page and is absent when the returned page is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_after: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn custom_window() {
        let params = PageParams::new(Some(3), Some(25));
        assert_eq!(params.page(), 3);
        assert_eq!(params.page_size(), 25);
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn page_floored_and_size_clamped() {
        let params = PageParams::new(Some(-4), Some(500));
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);
    }

    #[test]
    fn zero_size_clamped_up() {
        let params = PageParams::new(None, Some(0));
        assert_eq!(params.page_size(), 1);
    }
}
