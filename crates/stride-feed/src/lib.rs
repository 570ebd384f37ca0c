//! # stride-feed
//!
//! Client-side synchronization core for Stride feeds.
//!
//! Each logical feed (the activity feed, a goal's stories, the discover list,
//! the comment thread of one activity) is driven by its own controller which
//! owns an [`EntityCache`](cache::EntityCache), a
//! [`PageCursor`](cursor::PageCursor) and a set of pending mutation markers.
//! Reads flow from the [`FeedApi`] through the paginated loader into the
//! cache; writes go through the [`MutationCoordinator`](mutation::MutationCoordinator),
//! which applies them optimistically and reconciles or rolls back once the
//! remote call resolves.

pub mod activity_feed;
pub mod api;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod discover;
pub mod events;
pub mod loader;
pub mod mutation;
pub mod scroll;
pub mod thread;

mod error;

#[cfg(test)]
mod testing;

pub use activity_feed::{ActivityFeed, ActivityFilter};
pub use api::FeedApi;
pub use config::FeedConfig;
pub use cursor::Pagination;
pub use discover::DiscoverFeed;
pub use error::{FeedError, Result, ValidationError};
pub use events::{EventSink, FeedEvent};
pub use loader::{FeedSnapshot, LoadMore};
pub use mutation::MutationOutcome;
pub use scroll::{PageSource, ScrollTrigger, TriggerOutcome, ViewportSample};
pub use thread::{CommentThread, Composer, ReplyTarget};
