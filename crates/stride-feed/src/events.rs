//! Notifications for the UI layer.
//!
//! Controllers publish [`FeedEvent`]s on a broadcast channel; the UI turns
//! `MutationFailed` into a toast and `LoadFailed` into a retry prompt.

use serde::Serialize;
use tokio::sync::broadcast;

use stride_shared::{ActivityId, CommentId};

pub const FEED_ACTIVITIES: &str = "activities";
pub const FEED_DISCOVER: &str = "discover";
pub const FEED_COMMENTS: &str = "comments";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeedEvent {
    PageLoaded {
        feed: String,
        page: u32,
        has_more: bool,
    },
    LoadFailed {
        feed: String,
        page: u32,
        error: String,
    },
    MutationFailed {
        feed: String,
        target: String,
        error: String,
    },
    CommentPosted {
        activity_id: ActivityId,
        comment_id: CommentId,
        is_reply: bool,
    },
}

/// Sending half of the feed event channel.  Cloning is cheap; a sink built
/// with [`EventSink::disabled`] drops every event.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<broadcast::Sender<FeedEvent>>,
}

impl EventSink {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<FeedEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Subscribe another receiver, if the sink is enabled.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<FeedEvent>> {
        self.tx.as_ref().map(|tx| tx.subscribe())
    }

    pub fn emit(&self, event: FeedEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.send(event) {
            tracing::debug!(event = ?e.0, "No subscriber for feed event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let (sink, mut rx) = EventSink::new(8);
        sink.emit(FeedEvent::PageLoaded {
            feed: FEED_ACTIVITIES.to_string(),
            page: 2,
            has_more: false,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            FeedEvent::PageLoaded {
                feed: FEED_ACTIVITIES.to_string(),
                page: 2,
                has_more: false,
            }
        );
    }

    #[test]
    fn test_disabled_sink_drops_events() {
        let sink = EventSink::disabled();
        assert!(sink.subscribe().is_none());
        sink.emit(FeedEvent::LoadFailed {
            feed: FEED_DISCOVER.to_string(),
            page: 1,
            error: "offline".to_string(),
        });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(FeedEvent::MutationFailed {
            feed: FEED_COMMENTS.to_string(),
            target: "c1".to_string(),
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "mutation-failed");
        assert_eq!(json["target"], "c1");
    }
}
