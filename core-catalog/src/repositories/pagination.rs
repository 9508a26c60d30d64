//! Pagination helper types for repository queries

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
/// Largest page size a request may ask for.
pub const MAX_LIMIT: i64 = 100;

/// Pagination request parameters
///
/// Pages are 1-indexed. Non-positive values fall back to the defaults
/// (page 1, limit 10); limits above [`MAX_LIMIT`] are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Number of items per page
    pub limit: i64,
}

impl PageRequest {
    /// Create a normalized page request
    ///
    /// # Examples
    ///
    /// ```
    /// use core_catalog::repositories::PageRequest;
    ///
    /// let request = PageRequest::new(0, -5);
    /// assert_eq!(request.page, 1);
    /// assert_eq!(request.limit, 10);
    /// ```
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }.normalized()
    }

    /// Replace non-positive fields with their defaults and cap the limit.
    pub fn normalized(self) -> Self {
        Self {
            page: if self.page <= 0 { DEFAULT_PAGE } else { self.page },
            limit: if self.limit <= 0 {
                DEFAULT_LIMIT
            } else {
                self.limit.min(MAX_LIMIT)
            },
        }
    }

    /// Calculate the SQL OFFSET value
    pub fn offset(&self) -> i64 {
        let request = self.normalized();
        (request.page - 1).saturating_mul(request.limit)
    }

    /// Get the LIMIT value
    pub fn limit(&self) -> i64 {
        self.normalized().limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Paginated response containing items and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in the current page
    #[serde(rename = "data")]
    pub items: Vec<T>,
    /// Total number of items matching the query across all pages
    pub total_items: i64,
    /// Total number of pages, never less than 1
    pub total_pages: i64,
    /// Current page number
    pub page: i64,
    /// Number of items per page
    pub limit: i64,
}

impl<T> Page<T> {
    /// Create a new paginated response
    ///
    /// # Examples
    ///
    /// ```
    /// use core_catalog::repositories::{Page, PageRequest};
    ///
    /// let page = Page::new(vec![1, 2, 3], 25, PageRequest::new(1, 10));
    /// assert_eq!(page.total_pages, 3);
    ///
    /// let empty: Page<i32> = Page::new(vec![], 0, PageRequest::default());
    /// assert_eq!(empty.total_pages, 1);
    /// ```
    pub fn new(items: Vec<T>, total_items: i64, request: PageRequest) -> Self {
        let request = request.normalized();
        let total_items = total_items.max(0);
        let remainder = i64::from(total_items % request.limit != 0);
        let total_pages = (total_items / request.limit + remainder).max(1);

        Self {
            items,
            total_items,
            total_pages,
            page: request.page,
            limit: request.limit,
        }
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            page: self.page,
            limit: self.limit,
        }
    }
}
