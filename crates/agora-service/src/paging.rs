//! # Pagination
//!
//! One-based page requests with clamped page sizes, and the paged
//! response envelope the listing operations return.

use agora_store::Page;
use serde::Serialize;

/// Page size applied when the caller does not specify one.
pub const DEFAULT_PER_PAGE: u32 = 50;
/// Largest accepted page size; larger requests are clamped, not
/// rejected.
pub const MAX_PER_PAGE: u32 = 100;

/// A validated, clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a request from optional query inputs. Page numbers start at
    /// 1; zero and absent both mean the first page.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// The 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items per page after clamping.
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// The row limit to pass to the store.
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// The row offset to pass to the store.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the counts a client needs to paginate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    /// Total matching items across all pages.
    pub total: u64,
    /// Total pages at this page size; 0 when nothing matched.
    pub total_pages: u64,
}

impl<T> Paged<T> {
    /// Wrap a store page in the response envelope.
    pub fn from_page(page: Page<T>, request: PageRequest) -> Self {
        let total_pages = page.total.div_ceil(u64::from(request.per_page()));
        Self {
            items: page.items,
            page: request.page(),
            per_page: request.per_page(),
            total: page.total,
            total_pages,
        }
    }

    /// Map the items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}
