//! Fixtures and a scripted [`FeedApi`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use stride_shared::{
    Activity, ActivityData, ActivityId, ActivityKind, ApiError, ApiResult, AuthorRef, Comment,
    CommentId, DiscoverUser, Page, Reply, ToggleCount, UserId,
};

use crate::activity_feed::ActivityFilter;
use crate::api::FeedApi;

pub(crate) fn author(id: &str) -> AuthorRef {
    AuthorRef {
        id: UserId::new(id),
        display_name: format!("User {id}"),
        username: id.to_string(),
        avatar_url: None,
    }
}

pub(crate) fn activity(id: &str, like_count: u32, is_liked: bool) -> Activity {
    Activity {
        id: ActivityId::new(id),
        user: author("u1"),
        kind: ActivityKind::GoalCompleted,
        data: ActivityData {
            goal_title: Some(format!("Goal {id}")),
            ..Default::default()
        },
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        like_count,
        is_liked,
        comment_count: 0,
        is_public: true,
    }
}

pub(crate) fn comment(id: &str) -> Comment {
    Comment {
        id: CommentId::new(id),
        author: author("u2"),
        text: format!("comment {id}"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        like_count: 0,
        is_liked: false,
        replies: Vec::new(),
    }
}

pub(crate) fn reply(id: &str, parent: &str) -> Reply {
    Reply {
        id: CommentId::new(id),
        parent_id: CommentId::new(parent),
        author: author("u3"),
        text: format!("reply {id}"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        like_count: 0,
        is_liked: false,
        mention: None,
    }
}

pub(crate) fn user(id: &str, followers: u32, following: bool) -> DiscoverUser {
    DiscoverUser {
        id: UserId::new(id),
        display_name: format!("User {id}"),
        username: id.to_string(),
        avatar_url: None,
        bio: None,
        is_following: following,
        followers_count: followers,
        goals_count: 2,
    }
}

/// Remote calls recorded by [`MockApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ActivityPage { filter: ActivityFilter, page: u32 },
    CommentsPage { activity: String, page: u32 },
    ActivityLike { activity: String, like: bool },
    CommentLike { comment: String, like: bool },
    PostComment { text: String },
    PostReply { parent: String, text: String, mention: Option<String> },
    DiscoveryPage { page: u32 },
    Follow { user: String, follow: bool },
}

/// Scripted API: responses are queued per operation and every call is
/// recorded.  When gated, each call waits for a permit before answering.
#[derive(Default)]
pub(crate) struct MockApi {
    activity_pages: Mutex<HashMap<u32, ApiResult<Page<Activity>>>>,
    comment_pages: Mutex<HashMap<u32, ApiResult<Page<Comment>>>>,
    discovery_pages: Mutex<HashMap<u32, ApiResult<Page<DiscoverUser>>>>,
    toggles: Mutex<VecDeque<ApiResult<ToggleCount>>>,
    comments: Mutex<VecDeque<ApiResult<Comment>>>,
    replies: Mutex<VecDeque<ApiResult<Reply>>>,
    calls: Mutex<Vec<Call>>,
    started: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Calls block until [`MockApi::release`] hands out a permit.
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub(crate) fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub(crate) fn with_activity_page(self, page: u32, result: ApiResult<Page<Activity>>) -> Self {
        self.activity_pages.lock().insert(page, result);
        self
    }

    pub(crate) fn with_comment_page(self, page: u32, result: ApiResult<Page<Comment>>) -> Self {
        self.comment_pages.lock().insert(page, result);
        self
    }

    pub(crate) fn with_discovery_page(
        self,
        page: u32,
        result: ApiResult<Page<DiscoverUser>>,
    ) -> Self {
        self.discovery_pages.lock().insert(page, result);
        self
    }

    pub(crate) fn with_toggle(self, result: ApiResult<ToggleCount>) -> Self {
        self.toggles.lock().push_back(result);
        self
    }

    pub(crate) fn with_comment(self, result: ApiResult<Comment>) -> Self {
        self.comments.lock().push_back(result);
        self
    }

    pub(crate) fn with_reply(self, result: ApiResult<Reply>) -> Self {
        self.replies.lock().push_back(result);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls that have reached the mock, gated or not.
    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().push(call);
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

fn missing<T>(what: &str) -> ApiResult<T> {
    Err(ApiError::Status {
        status: 404,
        message: format!("no scripted response for {what}"),
    })
}

#[async_trait]
impl FeedApi for MockApi {
    async fn fetch_activity_page(
        &self,
        filter: &ActivityFilter,
        page: u32,
        _page_size: u32,
    ) -> ApiResult<Page<Activity>> {
        self.enter(Call::ActivityPage {
            filter: filter.clone(),
            page,
        })
        .await;
        self.activity_pages
            .lock()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| missing("activity page"))
    }

    async fn fetch_comments_page(
        &self,
        activity_id: &ActivityId,
        page: u32,
        _page_size: u32,
    ) -> ApiResult<Page<Comment>> {
        self.enter(Call::CommentsPage {
            activity: activity_id.to_string(),
            page,
        })
        .await;
        self.comment_pages
            .lock()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| missing("comment page"))
    }

    async fn toggle_activity_like(
        &self,
        activity_id: &ActivityId,
        like: bool,
    ) -> ApiResult<ToggleCount> {
        self.enter(Call::ActivityLike {
            activity: activity_id.to_string(),
            like,
        })
        .await;
        self.toggles
            .lock()
            .pop_front()
            .unwrap_or_else(|| missing("activity like"))
    }

    async fn toggle_comment_like(
        &self,
        _activity_id: &ActivityId,
        comment_id: &CommentId,
        like: bool,
    ) -> ApiResult<ToggleCount> {
        self.enter(Call::CommentLike {
            comment: comment_id.to_string(),
            like,
        })
        .await;
        self.toggles
            .lock()
            .pop_front()
            .unwrap_or_else(|| missing("comment like"))
    }

    async fn post_comment(&self, _activity_id: &ActivityId, text: &str) -> ApiResult<Comment> {
        self.enter(Call::PostComment {
            text: text.to_string(),
        })
        .await;
        self.comments
            .lock()
            .pop_front()
            .unwrap_or_else(|| missing("comment"))
    }

    async fn post_reply(
        &self,
        _activity_id: &ActivityId,
        parent_id: &CommentId,
        text: &str,
        mention_user_id: Option<&UserId>,
    ) -> ApiResult<Reply> {
        self.enter(Call::PostReply {
            parent: parent_id.to_string(),
            text: text.to_string(),
            mention: mention_user_id.map(|id| id.to_string()),
        })
        .await;
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| missing("reply"))
    }

    async fn fetch_discovery_page(
        &self,
        page: u32,
        _page_size: u32,
    ) -> ApiResult<Page<DiscoverUser>> {
        self.enter(Call::DiscoveryPage { page }).await;
        self.discovery_pages
            .lock()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| missing("discovery page"))
    }

    async fn toggle_follow(&self, user_id: &UserId, follow: bool) -> ApiResult<ToggleCount> {
        self.enter(Call::Follow {
            user: user_id.to_string(),
            follow,
        })
        .await;
        self.toggles
            .lock()
            .pop_front()
            .unwrap_or_else(|| missing("follow"))
    }
}
