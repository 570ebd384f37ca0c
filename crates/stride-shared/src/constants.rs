/// Application name
pub const APP_NAME: &str = "Stride";

/// Default number of activities requested per page
pub const DEFAULT_ACTIVITY_PAGE_SIZE: u32 = 10;

/// Default number of top-level comments requested per page
pub const DEFAULT_COMMENT_PAGE_SIZE: u32 = 20;

/// Default number of users requested per discovery page
pub const DEFAULT_DISCOVER_PAGE_SIZE: u32 = 12;

/// Distance (in logical pixels) below the viewport at which the next page is
/// requested
pub const DEFAULT_PREFETCH_MARGIN: f64 = 200.0;

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default API base URL (local development)
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Total page count assumed when the server omits pagination metadata
pub const DEFAULT_TOTAL_PAGES: u32 = 1;

/// Maximum comment / reply body length accepted by the API, in characters
pub const MAX_COMMENT_LENGTH: usize = 1000;
