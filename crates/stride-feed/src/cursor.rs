//! Pagination bookkeeping for one feed.

use serde::Serialize;

use stride_shared::constants::DEFAULT_TOTAL_PAGES;

/// Cursor over the pages of one feed.
///
/// `page` only moves forward between resets and `has_more` never flips back
/// to `true` except through [`PageCursor::reset`] or a first-page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    total_pages: Option<u32>,
    has_more: bool,
    loaded: bool,
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 0,
            total_pages: None,
            has_more: true,
            loaded: false,
        }
    }

    /// Back to "nothing fetched yet" (filter change, forced refresh).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a successful first-page load.
    pub fn first_page(&mut self, total_pages: Option<u32>) {
        let total = total_pages.unwrap_or(DEFAULT_TOTAL_PAGES);
        self.page = 1;
        self.total_pages = Some(total);
        self.has_more = 1 < total;
        self.loaded = true;
    }

    /// Record a successful load of page `next`.
    pub fn advance(&mut self, next: u32, total_pages: Option<u32>) {
        let total = total_pages.unwrap_or(DEFAULT_TOTAL_PAGES);
        self.page = self.page.max(next);
        self.total_pages = Some(total);
        self.has_more = self.has_more && next < total;
    }

    /// Stop paginating after a failed load-more.
    pub fn freeze(&mut self) {
        self.has_more = false;
    }

    pub fn next_page(&self) -> u32 {
        self.page + 1
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Pagination state exposed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub total_pages: Option<u32>,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    /// Message of the last failed load, cleared by the next successful one.
    pub last_error: Option<String>,
}
