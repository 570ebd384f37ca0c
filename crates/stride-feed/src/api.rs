//! The remote collaborator every feed talks to.

use async_trait::async_trait;

use stride_shared::{
    Activity, ActivityId, ApiResult, Comment, CommentId, DiscoverUser, Page, Reply, ToggleCount,
    UserId,
};

use crate::activity_feed::ActivityFilter;

/// Operations the feed core needs from the Stride API.
///
/// Implementations own transport concerns (URLs, auth, timeouts).  Toggle
/// calls take the *intended* new state and return the server's
/// authoritative flag and count.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn fetch_activity_page(
        &self,
        filter: &ActivityFilter,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Activity>>;

    async fn fetch_comments_page(
        &self,
        activity_id: &ActivityId,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Comment>>;

    async fn toggle_activity_like(
        &self,
        activity_id: &ActivityId,
        like: bool,
    ) -> ApiResult<ToggleCount>;

    async fn toggle_comment_like(
        &self,
        activity_id: &ActivityId,
        comment_id: &CommentId,
        like: bool,
    ) -> ApiResult<ToggleCount>;

    async fn post_comment(&self, activity_id: &ActivityId, text: &str) -> ApiResult<Comment>;

    async fn post_reply(
        &self,
        activity_id: &ActivityId,
        parent_id: &CommentId,
        text: &str,
        mention_user_id: Option<&UserId>,
    ) -> ApiResult<Reply>;

    async fn fetch_discovery_page(&self, page: u32, page_size: u32)
        -> ApiResult<Page<DiscoverUser>>;

    async fn toggle_follow(&self, user_id: &UserId, follow: bool) -> ApiResult<ToggleCount>;
}
