//! # stride-client
//!
//! Wires the feed core to the Stride REST API: configuration from the
//! environment, the reqwest-backed [`HttpApi`], tracing setup, and a
//! [`Session`] that hands out feed controllers sharing one API client and
//! one event channel.

pub mod config;
pub mod error;
pub mod http;

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use stride_feed::{
    ActivityFeed, ActivityFilter, CommentThread, DiscoverFeed, EventSink, FeedApi, FeedConfig,
    FeedEvent, PageSource, ScrollTrigger,
};
use stride_shared::ActivityId;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use http::HttpApi;

/// Capacity of the session's feed event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Install the global tracing subscriber.  `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stride_client=debug,stride_feed=debug,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Factory for the feeds of one signed-in user.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn FeedApi>,
    config: FeedConfig,
    events: EventSink,
}

impl Session {
    pub fn new(api: Arc<dyn FeedApi>, config: FeedConfig, events: EventSink) -> Self {
        Self {
            api,
            config,
            events,
        }
    }

    /// Build a session talking HTTP to the configured API.  The returned
    /// receiver sees every [`FeedEvent`] of the session's feeds.
    pub fn connect(config: &ClientConfig) -> Result<(Self, broadcast::Receiver<FeedEvent>)> {
        let api = HttpApi::new(config)?;
        info!(api_url = %api.base_url(), authenticated = config.api_token.is_some(), "Session created");
        let (events, rx) = EventSink::new(EVENT_CHANNEL_CAPACITY);
        Ok((Self::new(Arc::new(api), config.feed.clone(), events), rx))
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn activity_feed(&self, filter: ActivityFilter) -> Arc<ActivityFeed> {
        Arc::new(ActivityFeed::new(
            Arc::clone(&self.api),
            filter,
            &self.config,
            self.events.clone(),
        ))
    }

    pub fn comment_thread(&self, activity_id: ActivityId) -> Arc<CommentThread> {
        Arc::new(CommentThread::new(
            Arc::clone(&self.api),
            activity_id,
            &self.config,
            self.events.clone(),
        ))
    }

    pub fn discover(&self) -> Arc<DiscoverFeed> {
        Arc::new(DiscoverFeed::new(
            Arc::clone(&self.api),
            &self.config,
            self.events.clone(),
        ))
    }

    pub fn scroll_trigger<S: PageSource + ?Sized>(&self, source: Arc<S>) -> ScrollTrigger<S> {
        ScrollTrigger::new(source, self.config.prefetch_margin)
    }

    /// Keep `feed`'s comment counts in step with comments posted from any
    /// thread of this session.  The task holds the feed weakly and ends once
    /// the feed is dropped or torn down, or the session's events are
    /// disabled.
    pub fn track_comment_counts(&self, feed: &Arc<ActivityFeed>) -> Option<JoinHandle<()>> {
        let mut rx = self.events.subscribe()?;
        let weak: Weak<ActivityFeed> = Arc::downgrade(feed);
        Some(tokio::spawn(async move {
            loop {
                let event = rx.recv().await;
                let Some(feed) = weak.upgrade().filter(|f| !f.is_torn_down()) else {
                    debug!("Feed gone, comment count tracker stopped");
                    break;
                };
                match event {
                    Ok(FeedEvent::CommentPosted { activity_id, .. }) => {
                        if feed.adjust_comment_count(&activity_id, 1) {
                            debug!(activity = %activity_id, "Comment count bumped");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Comment count tracker lagged behind feed events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }
}
