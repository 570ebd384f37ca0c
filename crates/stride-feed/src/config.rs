//! Per-feed tuning knobs.

use stride_shared::constants::{
    DEFAULT_ACTIVITY_PAGE_SIZE, DEFAULT_COMMENT_PAGE_SIZE, DEFAULT_DISCOVER_PAGE_SIZE,
    DEFAULT_PREFETCH_MARGIN,
};

/// Feed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Activities requested per page.
    pub activity_page_size: u32,

    /// Top-level comments requested per page of a thread.
    pub comment_page_size: u32,

    /// Users requested per page of the discover list.
    pub discover_page_size: u32,

    /// How far below the viewport (in logical pixels) the sentinel may be
    /// when the next page is requested.
    pub prefetch_margin: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            activity_page_size: DEFAULT_ACTIVITY_PAGE_SIZE,
            comment_page_size: DEFAULT_COMMENT_PAGE_SIZE,
            discover_page_size: DEFAULT_DISCOVER_PAGE_SIZE,
            prefetch_margin: DEFAULT_PREFETCH_MARGIN,
        }
    }
}
