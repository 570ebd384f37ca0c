//! [`FeedApi`] over the Stride REST API.
//!
//! Request and response bodies are camelCase JSON.  Collections come wrapped
//! in an envelope (`{ activities, pagination: { totalPages } }`), single
//! records under their own key (`{ comment }`, `{ reply }`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use stride_feed::{ActivityFilter, FeedApi};
use stride_shared::{
    Activity, ActivityId, ApiError, ApiResult, Comment, CommentId, DiscoverUser, Page, Reply,
    ToggleCount, UserId,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ActivitiesEnvelope {
    activities: Vec<Activity>,
    #[serde(default)]
    pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    comments: Vec<Comment>,
    #[serde(default)]
    pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
struct UsersEnvelope {
    users: Vec<DiscoverUser>,
    #[serde(default)]
    pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
struct CommentEnvelope {
    comment: Comment,
}

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    reply: Reply,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeState {
    like_count: u32,
    is_liked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowState {
    is_following: bool,
    followers_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mention_user_id: Option<&'a UserId>,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP implementation of [`FeedApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        debug!(method = "GET", path, "API request");
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = "POST", path, "API request");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed
                .error
                .or(parsed.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            debug!(status = status.as_u16(), %message, "API error response");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

fn page_query(page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("limit", page_size.to_string())]
}

#[async_trait]
impl FeedApi for HttpApi {
    async fn fetch_activity_page(
        &self,
        filter: &ActivityFilter,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Activity>> {
        let mut query = page_query(page, page_size);
        query.push(("filter", filter.name().to_string()));
        match filter {
            ActivityFilter::Goal(goal_id) => query.push(("goalId", goal_id.to_string())),
            ActivityFilter::User(user_id) => query.push(("userId", user_id.to_string())),
            ActivityFilter::Following | ActivityFilter::Everyone => {}
        }

        let envelope: ActivitiesEnvelope = self.get("/activities", &query).await?;
        Ok(Page::new(envelope.activities, envelope.pagination.total_pages))
    }

    async fn fetch_comments_page(
        &self,
        activity_id: &ActivityId,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Comment>> {
        let path = format!("/activities/{activity_id}/comments");
        let envelope: CommentsEnvelope = self.get(&path, &page_query(page, page_size)).await?;
        Ok(Page::new(envelope.comments, envelope.pagination.total_pages))
    }

    async fn toggle_activity_like(
        &self,
        activity_id: &ActivityId,
        like: bool,
    ) -> ApiResult<ToggleCount> {
        let path = format!("/activities/{activity_id}/like");
        let state: LikeState = self.post(&path, &json!({ "like": like })).await?;
        Ok(ToggleCount::new(state.is_liked, state.like_count))
    }

    async fn toggle_comment_like(
        &self,
        activity_id: &ActivityId,
        comment_id: &CommentId,
        like: bool,
    ) -> ApiResult<ToggleCount> {
        let path = format!("/activities/{activity_id}/comments/{comment_id}/like");
        let state: LikeState = self.post(&path, &json!({ "like": like })).await?;
        Ok(ToggleCount::new(state.is_liked, state.like_count))
    }

    async fn post_comment(&self, activity_id: &ActivityId, text: &str) -> ApiResult<Comment> {
        let path = format!("/activities/{activity_id}/comments");
        let envelope: CommentEnvelope = self.post(&path, &json!({ "text": text })).await?;
        Ok(envelope.comment)
    }

    async fn post_reply(
        &self,
        activity_id: &ActivityId,
        parent_id: &CommentId,
        text: &str,
        mention_user_id: Option<&UserId>,
    ) -> ApiResult<Reply> {
        let path = format!("/activities/{activity_id}/comments/{parent_id}/replies");
        let body = ReplyBody {
            text,
            mention_user_id,
        };
        let envelope: ReplyEnvelope = self.post(&path, &body).await?;
        Ok(envelope.reply)
    }

    async fn fetch_discovery_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<DiscoverUser>> {
        let envelope: UsersEnvelope = self
            .get("/users/discover", &page_query(page, page_size))
            .await?;
        Ok(Page::new(envelope.users, envelope.pagination.total_pages))
    }

    async fn toggle_follow(&self, user_id: &UserId, follow: bool) -> ApiResult<ToggleCount> {
        let path = format!("/users/{user_id}/follow");
        let state: FollowState = self.post(&path, &json!({ "follow": follow })).await?;
        Ok(ToggleCount::new(state.is_following, state.followers_count))
    }
}
