//! The activity feed controller.
//!
//! One instance per visible feed: the home feed, the public feed, a goal's
//! stories or a user's profile.  Each owns its own cache and cursor.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use stride_shared::{Activity, ActivityId, GoalId, ToggleCount, UserId};

use crate::api::FeedApi;
use crate::config::FeedConfig;
use crate::cursor::Pagination;
use crate::error::Result;
use crate::events::{EventSink, FEED_ACTIVITIES};
use crate::loader::{FeedSnapshot, LoadMore, PaginatedLoader};
use crate::mutation::{MutationCoordinator, MutationOutcome};
use crate::scroll::PageSource;

/// Which activities a feed shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ActivityFilter {
    /// Activities of followed users (the home tab).
    #[default]
    Following,
    /// All public activities.
    Everyone,
    /// Stories of a single goal.
    Goal(GoalId),
    /// Activities of a single user.
    User(UserId),
}

impl ActivityFilter {
    pub fn name(&self) -> &'static str {
        match self {
            ActivityFilter::Following => "following",
            ActivityFilter::Everyone => "everyone",
            ActivityFilter::Goal(_) => "goal",
            ActivityFilter::User(_) => "user",
        }
    }
}

pub struct ActivityFeed {
    api: Arc<dyn FeedApi>,
    filter: Mutex<ActivityFilter>,
    page_size: u32,
    loader: PaginatedLoader<Activity>,
    likes: MutationCoordinator<ActivityId>,
}

impl ActivityFeed {
    pub fn new(
        api: Arc<dyn FeedApi>,
        filter: ActivityFilter,
        config: &FeedConfig,
        events: EventSink,
    ) -> Self {
        Self {
            api,
            filter: Mutex::new(filter),
            page_size: config.activity_page_size,
            loader: PaginatedLoader::new(FEED_ACTIVITIES, events.clone()),
            likes: MutationCoordinator::new(FEED_ACTIVITIES, events),
        }
    }

    pub fn filter(&self) -> ActivityFilter {
        self.filter.lock().clone()
    }

    pub async fn load_first_page(&self, force_refresh: bool) -> Result<FeedSnapshot<Activity>> {
        let api = Arc::clone(&self.api);
        let filter = self.filter();
        self.loader
            .load_first_page(
                move |page, size| async move { api.fetch_activity_page(&filter, page, size).await },
                self.page_size,
                force_refresh,
            )
            .await
    }

    pub async fn load_more(&self) -> Result<LoadMore> {
        let api = Arc::clone(&self.api);
        let filter = self.filter();
        self.loader
            .load_more(
                move |page, size| async move { api.fetch_activity_page(&filter, page, size).await },
                self.page_size,
            )
            .await
    }

    /// Switch tabs.  A different filter resets the cursor and reloads from
    /// page 1; the same filter only loads if nothing is loaded yet.
    pub async fn set_filter(&self, filter: ActivityFilter) -> Result<FeedSnapshot<Activity>> {
        let changed = {
            let mut current = self.filter.lock();
            if *current == filter {
                false
            } else {
                *current = filter.clone();
                true
            }
        };
        if changed {
            info!(filter = filter.name(), "Activity filter changed, resetting feed");
            self.loader.reset();
        }
        self.load_first_page(false).await
    }

    /// Like or unlike an activity, optimistically.
    pub async fn toggle_like(&self, id: &ActivityId) -> Result<MutationOutcome<ToggleCount>> {
        self.loader.ensure_live()?;
        self.likes
            .toggle(
                id.clone(),
                || self.loader.with_cache(|cache| cache.get(id).map(Activity::like_state)),
                |state| {
                    self.loader.update(|cache| {
                        cache.replace_one(id, |activity| activity.set_like_state(state))
                    });
                },
                |like| self.api.toggle_activity_like(id, like),
            )
            .await
    }

    /// Shift an activity's comment count, e.g. after its thread posted a
    /// comment.  Saturates at zero.  Returns `false` if it is not cached.
    pub fn adjust_comment_count(&self, id: &ActivityId, delta: i32) -> bool {
        self.loader
            .update(|cache| {
                cache.replace_one(id, |activity| {
                    activity.comment_count = activity.comment_count.saturating_add_signed(delta);
                })
            })
            .unwrap_or(false)
    }

    pub fn items(&self) -> Vec<Activity> {
        self.loader.items()
    }

    pub fn get(&self, id: &ActivityId) -> Option<Activity> {
        self.loader.get(id)
    }

    pub fn pagination(&self) -> Pagination {
        self.loader.pagination()
    }

    pub fn is_like_pending(&self, id: &ActivityId) -> bool {
        self.likes.is_pending(id)
    }

    pub fn teardown(&self) {
        self.loader.teardown();
        self.likes.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.loader.is_torn_down()
    }
}

#[async_trait]
impl PageSource for ActivityFeed {
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
    use crate::testing::{activity, Call, MockApi};

    fn feed(api: Arc<MockApi>) -> ActivityFeed {
        ActivityFeed::new(
            api,
            ActivityFilter::Following,
            &FeedConfig::default(),
            EventSink::disabled(),
        )
    }

    fn like_state(feed: &ActivityFeed, id: &str) -> ToggleCount {
        feed.get(&ActivityId::new(id)).unwrap().like_state()
    }

    #[tokio::test]
    async fn test_first_page_then_no_more() {
        let api = Arc::new(MockApi::new().with_activity_page(
            1,
            Ok(Page::new(
                vec![activity("1", 0, false), activity("2", 0, false)],
                Some(1),
            )),
        ));
        let feed = feed(api.clone());

        let snapshot = feed.load_first_page(false).await.unwrap();
        assert_eq!(snapshot.items.len(), 2);
        assert!(!snapshot.pagination.has_more);

        assert_eq!(feed.load_more().await.unwrap(), LoadMore::Skipped);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_like_confirmed_by_server() {
        let api = Arc::new(
            MockApi::new()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 0, false)], Some(1))))
                .with_toggle(Ok(ToggleCount::new(true, 1))),
        );
        let feed = feed(api.clone());
        feed.load_first_page(false).await.unwrap();

        let outcome = feed.toggle_like(&ActivityId::new("1")).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied(ToggleCount::new(true, 1)));
        assert_eq!(like_state(&feed, "1"), ToggleCount::new(true, 1));
        assert!(api.calls().contains(&Call::ActivityLike {
            activity: "1".into(),
            like: true
        }));
    }

    #[tokio::test]
    async fn test_like_rolled_back_on_failure() {
        let api = Arc::new(
            MockApi::new()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 5, false)], Some(1))))
                .with_toggle(Err(ApiError::Network("reset".into()))),
        );
        let feed = feed(api);
        feed.load_first_page(false).await.unwrap();

        let err = feed.toggle_like(&ActivityId::new("1")).await.unwrap_err();
        assert!(matches!(err, FeedError::Remote(_)));
        assert_eq!(like_state(&feed, "1"), ToggleCount::new(false, 5));
        assert!(!feed.is_like_pending(&ActivityId::new("1")));
    }

    #[tokio::test]
    async fn test_rapid_double_like_sends_one_call() {
        let api = Arc::new(
            MockApi::gated()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 0, false)], Some(1))))
                .with_toggle(Ok(ToggleCount::new(true, 1))),
        );
        let feed = feed(api.clone());
        api.release(1);
        feed.load_first_page(false).await.unwrap();

        let id = ActivityId::new("1");
        let first = feed.toggle_like(&id);
        let second = async {
            while api.started() < 2 {
                tokio::task::yield_now().await;
            }
            let outcome = feed.toggle_like(&id).await.unwrap();
            api.release(1);
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(second, MutationOutcome::Skipped);
        assert_eq!(
            first.unwrap(),
            MutationOutcome::Applied(ToggleCount::new(true, 1))
        );
        let like_calls = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ActivityLike { .. }))
            .count();
        assert_eq!(like_calls, 1);
        assert_eq!(like_state(&feed, "1"), ToggleCount::new(true, 1));
    }

    #[tokio::test]
    async fn test_like_unknown_activity() {
        let feed = feed(Arc::new(MockApi::new()));
        let err = feed.toggle_like(&ActivityId::new("nope")).await.unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }

    #[tokio::test]
    async fn test_filter_change_resets_cursor() {
        let goal = ActivityFilter::Goal(GoalId::new("g1"));
        let api = Arc::new(
            MockApi::new()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 0, false)], Some(3)))),
        );
        let feed = feed(api.clone());
        feed.load_first_page(false).await.unwrap();

        // Same filter: nothing refetched.
        feed.set_filter(ActivityFilter::Following).await.unwrap();
        assert_eq!(api.calls().len(), 1);

        let snapshot = feed.set_filter(goal.clone()).await.unwrap();
        assert_eq!(snapshot.pagination.page, 1);
        assert_eq!(
            api.calls().last(),
            Some(&Call::ActivityPage {
                filter: goal,
                page: 1
            })
        );
    }

    #[tokio::test]
    async fn test_adjust_comment_count_saturates() {
        let api = Arc::new(
            MockApi::new()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 0, false)], Some(1)))),
        );
        let feed = feed(api);
        feed.load_first_page(false).await.unwrap();

        let id = ActivityId::new("1");
        assert!(feed.adjust_comment_count(&id, 2));
        assert!(feed.adjust_comment_count(&id, -5));
        assert_eq!(feed.get(&id).unwrap().comment_count, 0);
        assert!(!feed.adjust_comment_count(&ActivityId::new("2"), 1));
    }

    #[tokio::test]
    async fn test_like_resolving_after_teardown_is_ignored() {
        let api = Arc::new(
            MockApi::gated()
                .with_activity_page(1, Ok(Page::new(vec![activity("1", 0, false)], Some(1))))
                .with_toggle(Err(ApiError::Timeout)),
        );
        let feed = feed(api.clone());
        api.release(1);
        feed.load_first_page(false).await.unwrap();

        let id = ActivityId::new("1");
        let pending = feed.toggle_like(&id);
        let teardown = async {
            while api.started() < 2 {
                tokio::task::yield_now().await;
            }
            feed.teardown();
            api.release(1);
        };

        let (outcome, ()) = tokio::join!(pending, teardown);
        assert_eq!(outcome.unwrap(), MutationOutcome::Discarded);
        assert!(feed.items().is_empty());
        assert!(feed.is_torn_down());
    }
}
