//! Client configuration loaded from environment variables.
//!
//! Everything has a default so the client can run against a local API with
//! zero configuration.

use std::str::FromStr;
use std::time::Duration;

use stride_feed::FeedConfig;
use stride_shared::constants::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the Stride REST API, without a trailing slash.
    /// Env: `STRIDE_API_URL`
    /// Default: `http://localhost:5000/api`
    pub api_url: String,

    /// Bearer token sent with every request.
    /// Env: `STRIDE_API_TOKEN`
    /// Default: none (anonymous).
    pub api_token: Option<String>,

    /// Per-request timeout.
    /// Env: `STRIDE_REQUEST_TIMEOUT_SECS`
    /// Default: 15 seconds.
    pub request_timeout: Duration,

    /// Page sizes and prefetch margin.
    /// Env: `STRIDE_ACTIVITY_PAGE_SIZE`, `STRIDE_COMMENT_PAGE_SIZE`,
    /// `STRIDE_DISCOVER_PAGE_SIZE`, `STRIDE_PREFETCH_MARGIN`
    pub feed: FeedConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            feed: FeedConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("STRIDE_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                tracing::warn!("Empty STRIDE_API_URL, using default");
            } else {
                config.api_url = url.to_string();
            }
        }

        if let Some(token) = lookup("STRIDE_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "STRIDE_REQUEST_TIMEOUT_SECS") {
            if secs > 0 {
                config.request_timeout = Duration::from_secs(secs);
            } else {
                tracing::warn!("STRIDE_REQUEST_TIMEOUT_SECS must be positive, using default");
            }
        }

        // -- Feed settings --

        if let Some(n) = parse_page_size(&lookup, "STRIDE_ACTIVITY_PAGE_SIZE") {
            config.feed.activity_page_size = n;
        }
        if let Some(n) = parse_page_size(&lookup, "STRIDE_COMMENT_PAGE_SIZE") {
            config.feed.comment_page_size = n;
        }
        if let Some(n) = parse_page_size(&lookup, "STRIDE_DISCOVER_PAGE_SIZE") {
            config.feed.discover_page_size = n;
        }

        if let Some(margin) = parse_var::<f64>(&lookup, "STRIDE_PREFETCH_MARGIN") {
            if margin.is_finite() && margin >= 0.0 {
                config.feed.prefetch_margin = margin;
            } else {
                tracing::warn!(value = margin, "Invalid STRIDE_PREFETCH_MARGIN, using default");
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(value = %raw, "Invalid {key}, using default");
            None
        }
    }
}

fn parse_page_size(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    match parse_var::<u32>(lookup, key)? {
        0 => {
            tracing::warn!("{key} must be at least 1, using default");
            None
        }
        n => Some(n),
    }
}
