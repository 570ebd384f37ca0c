//! People to follow.

use std::sync::Arc;

use async_trait::async_trait;

use stride_shared::{DiscoverUser, ToggleCount, UserId};

use crate::api::FeedApi;
use crate::config::FeedConfig;
use crate::cursor::Pagination;
use crate::error::Result;
use crate::events::{EventSink, FEED_DISCOVER};
use crate::loader::{FeedSnapshot, LoadMore, PaginatedLoader};
use crate::mutation::{MutationCoordinator, MutationOutcome};
use crate::scroll::PageSource;

pub struct DiscoverFeed {
    api: Arc<dyn FeedApi>,
    page_size: u32,
    loader: PaginatedLoader<DiscoverUser>,
    follows: MutationCoordinator<UserId>,
}

impl DiscoverFeed {
    pub fn new(api: Arc<dyn FeedApi>, config: &FeedConfig, events: EventSink) -> Self {
        Self {
            api,
            page_size: config.discover_page_size,
            loader: PaginatedLoader::new(FEED_DISCOVER, events.clone()),
            follows: MutationCoordinator::new(FEED_DISCOVER, events),
        }
    }

    pub async fn load_first_page(&self, force_refresh: bool) -> Result<FeedSnapshot<DiscoverUser>> {
        let api = Arc::clone(&self.api);
        self.loader
            .load_first_page(
                move |page, size| async move { api.fetch_discovery_page(page, size).await },
                self.page_size,
                force_refresh,
            )
            .await
    }

    pub async fn load_more(&self) -> Result<LoadMore> {
        let api = Arc::clone(&self.api);
        self.loader
            .load_more(
                move |page, size| async move { api.fetch_discovery_page(page, size).await },
                self.page_size,
            )
            .await
    }

    /// Follow or unfollow, optimistically.  The follower count moves with
    /// the flag.
    pub async fn toggle_follow(&self, id: &UserId) -> Result<MutationOutcome<ToggleCount>> {
        self.loader.ensure_live()?;
        self.follows
            .toggle(
                id.clone(),
                || self.loader.with_cache(|cache| cache.get(id).map(DiscoverUser::follow_state)),
                |state| {
                    self.loader
                        .update(|cache| cache.replace_one(id, |user| user.set_follow_state(state)));
                },
                |follow| self.api.toggle_follow(id, follow),
            )
            .await
    }

    pub fn items(&self) -> Vec<DiscoverUser> {
        self.loader.items()
    }

    pub fn get(&self, id: &UserId) -> Option<DiscoverUser> {
        self.loader.get(id)
    }

    pub fn pagination(&self) -> Pagination {
        self.loader.pagination()
    }

    pub fn is_follow_pending(&self, id: &UserId) -> bool {
        self.follows.is_pending(id)
    }

    pub fn teardown(&self) {
        self.loader.teardown();
        self.follows.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.loader.is_torn_down()
    }
}

#[async_trait]
impl PageSource for DiscoverFeed {
    async fn load_next(&self) -> Result<LoadMore> {
        self.load_more().await
    }

    fn has_more(&self) -> bool {
        self.loader.has_more()
    }

    fn is_torn_down(&self) -> bool {
        self.loader.is_torn_down()
    }
}

#[cfg(test)]
mod tests {
    use stride_shared::{ApiError, Page};

    use super::*;
    use crate::error::FeedError;
    use crate::testing::{user, Call, MockApi};

    fn discover(api: Arc<MockApi>) -> DiscoverFeed {
        DiscoverFeed::new(api, &FeedConfig::default(), EventSink::disabled())
    }

    #[tokio::test]
    async fn test_pages_merge_in_order() {
        let api = Arc::new(
            MockApi::new()
                .with_discovery_page(1, Ok(Page::new(vec![user("u1", 0, false)], Some(2))))
                .with_discovery_page(
                    2,
                    Ok(Page::new(vec![user("u1", 0, false), user("u2", 0, false)], Some(2))),
                ),
        );
        let feed = discover(api.clone());

        feed.load_first_page(false).await.unwrap();
        assert!(feed.pagination().has_more);

        let more = feed.load_more().await.unwrap();
        assert_eq!(
            more,
            LoadMore::Appended {
                page: 2,
                added: 1,
                has_more: false
            }
        );
        let ids: Vec<String> = feed.items().into_iter().map(|u| u.id.0).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(
            api.calls(),
            vec![Call::DiscoveryPage { page: 1 }, Call::DiscoveryPage { page: 2 }]
        );
    }

    #[tokio::test]
    async fn test_follow_moves_count_with_flag() {
        let api = Arc::new(
            MockApi::new()
                .with_discovery_page(1, Ok(Page::new(vec![user("u1", 3, false)], Some(1))))
                .with_toggle(Ok(ToggleCount::new(true, 4)))
                .with_toggle(Ok(ToggleCount::new(false, 3))),
        );
        let feed = discover(api.clone());
        feed.load_first_page(false).await.unwrap();
        let id = UserId::new("u1");

        feed.toggle_follow(&id).await.unwrap();
        let u = feed.get(&id).unwrap();
        assert!(u.is_following);
        assert_eq!(u.followers_count, 4);

        feed.toggle_follow(&id).await.unwrap();
        assert_eq!(feed.get(&id).unwrap().follow_state(), ToggleCount::new(false, 3));
        assert_eq!(
            api.calls()[1..],
            [
                Call::Follow {
                    user: "u1".into(),
                    follow: true
                },
                Call::Follow {
                    user: "u1".into(),
                    follow: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_follow_restores_state() {
        let api = Arc::new(
            MockApi::new()
                .with_discovery_page(1, Ok(Page::new(vec![user("u1", 3, true)], Some(1))))
                .with_toggle(Err(ApiError::Status {
                    status: 500,
                    message: "boom".into(),
                })),
        );
        let feed = discover(api);
        feed.load_first_page(false).await.unwrap();
        let id = UserId::new("u1");

        let err = feed.toggle_follow(&id).await.unwrap_err();
        assert!(matches!(err, FeedError::Remote(ApiError::Status { status: 500, .. })));
        assert_eq!(feed.get(&id).unwrap().follow_state(), ToggleCount::new(true, 3));
        assert!(!feed.is_follow_pending(&id));
    }

    #[tokio::test]
    async fn test_calls_after_teardown_fail() {
        let feed = discover(Arc::new(MockApi::new()));
        feed.teardown();
        assert_eq!(feed.load_first_page(false).await, Err(FeedError::TornDown));
        assert_eq!(
            feed.toggle_follow(&UserId::new("u1")).await,
            Err(FeedError::TornDown)
        );
        assert!(!PageSource::has_more(&feed));
    }
}
