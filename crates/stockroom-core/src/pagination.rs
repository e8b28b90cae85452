//! # Pagination
//!
//! Every listing endpoint accepts `page` and `limit` and answers with
//! the same metadata block:
//!
//! ```json
//! { "currentPage": 2, "totalPages": 5, "totalItems": 47, "itemsPerPage": 10 }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// A normalised page request (1-based page, bounded limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Builds a request from raw query values, falling back to defaults.
    ///
    /// ```rust
    /// use stockroom_core::PageRequest;
    ///
    /// let req = PageRequest::new(Some(0), Some(1000));
    /// assert_eq!(req.page, 1);
    /// assert_eq!(req.limit, 100);
    /// ```
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        PageRequest { page, limit }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Applies this page to an in-memory list (used for flattened item views).
    pub fn slice<T: Clone>(&self, all: &[T]) -> Vec<T> {
        all.iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

/// Page metadata returned alongside each listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let limit = request.limit.max(1) as u64;
        let total_pages = total_items.div_ceil(limit) as u32;
        Pagination {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::default();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_offset_and_slice() {
        let req = PageRequest::new(Some(2), Some(3));
        assert_eq!(req.offset(), 3);
        let data: Vec<i32> = (1..=8).collect();
        assert_eq!(req.slice(&data), vec![4, 5, 6]);

        let past_end = PageRequest::new(Some(9), Some(3));
        assert!(past_end.slice(&data).is_empty());
    }

    #[test]
    fn test_pagination_math() {
        let meta = Pagination::new(PageRequest::new(Some(1), Some(10)), 47);
        assert_eq!(meta.total_pages, 5);
        assert_eq!(meta.total_items, 47);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }
}
