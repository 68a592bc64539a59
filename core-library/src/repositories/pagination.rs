//! Paging for recording listings

use serde::{Deserialize, Serialize};

/// Largest page a listing will return
pub const MAX_PAGE_SIZE: u32 = 500;

/// Which slice of a listing to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: u32,
    /// Clamped to [`MAX_PAGE_SIZE`] when the query runs
    pub page_size: u32,
}

impl PageRequest {
    /// ```
    /// use core_library::repositories::PageRequest;
    ///
    /// let request = PageRequest::new(2, 25);
    /// assert_eq!(request.offset(), 50);
    /// assert_eq!(PageRequest::new(0, 10_000).limit(), 500);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> u32 {
        self.page_size.min(MAX_PAGE_SIZE)
    }

    /// SQL `OFFSET`, saturating for absurd page indexes
    pub fn offset(&self) -> u32 {
        self.page.saturating_mul(self.limit())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 50)
    }
}

/// One page of a listing with the size of the whole listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the filter across all pages
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let page_size = request.limit();
        let total_pages = match page_size {
            0 => 0,
            size => total.div_ceil(u64::from(size)).min(u64::from(u32::MAX)) as u32,
        };

        Self {
            items,
            total,
            page: request.page,
            total_pages,
            page_size,
        }
    }

    /// Whether a later page holds more rows
    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::new(0, 20).limit(), 20);
        assert_eq!(PageRequest::new(1, 2_000).limit(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(1, 2_000).offset(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(u32::MAX, 50).offset(), u32::MAX);
    }

    #[test]
    fn test_total_pages_and_next() {
        let first = Page::new(vec!["rec-1", "rec-2"], 5, PageRequest::new(0, 2));
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next());

        let last = Page::new(vec!["rec-5"], 5, PageRequest::new(2, 2));
        assert!(!last.has_next());
    }

    #[test]
    fn test_empty_listing() {
        let page = Page::<String>::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());

        let zero = Page::new(vec![1], 3, PageRequest::new(0, 0));
        assert_eq!(zero.total_pages, 0);
    }
}
