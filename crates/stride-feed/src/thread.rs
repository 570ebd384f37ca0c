//! Comment thread of a single activity.
//!
//! Top-level comments are kept newest-first, replies in the order they were
//! posted.  Comment and reply likes are optimistic; posting is not, because
//! a comment needs its server-issued id before it can be liked or replied
//! to.  Each comment's replies can be expanded or collapsed on their own.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use stride_shared::constants::MAX_COMMENT_LENGTH;
use stride_shared::{ActivityId, AuthorRef, Comment, CommentId, Reply, ToggleCount};

use crate::api::FeedApi;
use crate::cache::EntityCache;
use crate::config::FeedConfig;
use crate::cursor::Pagination;
use crate::error::{Result, ValidationError};
use crate::events::{EventSink, FeedEvent, FEED_COMMENTS};
use crate::loader::{FeedSnapshot, LoadMore, PaginatedLoader};
use crate::mutation::{MutationCoordinator, MutationOutcome};
use crate::scroll::PageSource;

/// Mutation keys within a thread.  Posting is serialized per thread, likes
/// per comment or reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThreadMutation {
    Like(CommentId),
    Post,
}

impl fmt::Display for ThreadMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadMutation::Like(id) => write!(f, "like:{id}"),
            ThreadMutation::Post => f.write_str("post"),
        }
    }
}

/// The comment a reply is being written for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Always a top-level comment.
    pub comment_id: CommentId,
    pub mention: Option<AuthorRef>,
}

/// Input state of the thread's comment box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    pub draft: String,
    pub replying_to: Option<ReplyTarget>,
}

pub struct CommentThread {
    api: Arc<dyn FeedApi>,
    activity_id: ActivityId,
    page_size: u32,
    loader: PaginatedLoader<Comment>,
    mutations: MutationCoordinator<ThreadMutation>,
    expanded: Mutex<HashSet<CommentId>>,
    composer: Mutex<Composer>,
    events: EventSink,
}

impl CommentThread {
    pub fn new(
        api: Arc<dyn FeedApi>,
        activity_id: ActivityId,
        config: &FeedConfig,
        events: EventSink,
    ) -> Self {
        Self {
            api,
            activity_id,
            page_size: config.comment_page_size,
            loader: PaginatedLoader::new(FEED_COMMENTS, events.clone()),
            mutations: MutationCoordinator::new(FEED_COMMENTS, events.clone()),
            expanded: Mutex::new(HashSet::new()),
            composer: Mutex::new(Composer::default()),
            events,
        }
    }

    pub fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    pub async fn load_first_page(&self, force_refresh: bool) -> Result<FeedSnapshot<Comment>> {
        let api = Arc::clone(&self.api);
        let activity_id = self.activity_id.clone();
        self.loader
            .load_first_page(
                move |page, size| async move {
                    api.fetch_comments_page(&activity_id, page, size).await
                },
                self.page_size,
                force_refresh,
            )
            .await
    }

    pub async fn load_more(&self) -> Result<LoadMore> {
        let api = Arc::clone(&self.api);
        let activity_id = self.activity_id.clone();
        self.loader
            .load_more(
                move |page, size| async move {
                    api.fetch_comments_page(&activity_id, page, size).await
                },
                self.page_size,
            )
            .await
    }

    /// Like or unlike a comment or a reply, optimistically.
    pub async fn toggle_like(&self, id: &CommentId) -> Result<MutationOutcome<ToggleCount>> {
        self.loader.ensure_live()?;
        self.mutations
            .toggle(
                ThreadMutation::Like(id.clone()),
                || self.loader.with_cache(|cache| like_state_of(cache, id)),
                |state| {
                    self.loader.update(|cache| set_like_state_of(cache, id, state));
                },
                |like| self.api.toggle_comment_like(&self.activity_id, id, like),
            )
            .await
    }

    /// Post a top-level comment.  On success it is shown first.  The
    /// composer is not touched; see [`submit`](Self::submit).
    pub async fn post_comment(&self, text: &str) -> Result<MutationOutcome<Comment>> {
        self.loader.ensure_live()?;
        let body = validate_body(text)?;

        let outcome = self
            .mutations
            .submit(
                ThreadMutation::Post,
                self.api.post_comment(&self.activity_id, &body),
                |comment: &Comment| {
                    self.loader.update(|cache| cache.prepend(comment.clone()));
                },
            )
            .await?;

        if let MutationOutcome::Applied(comment) = &outcome {
            info!(activity = %self.activity_id, comment = %comment.id, "Comment posted");
            self.events.emit(FeedEvent::CommentPosted {
                activity_id: self.activity_id.clone(),
                comment_id: comment.id.clone(),
                is_reply: false,
            });
        }
        Ok(outcome)
    }

    /// Reply to a comment.  Replying to a reply files the new reply under
    /// the same top-level comment, mentioning the reply's author unless a
    /// mention is given.
    pub async fn post_reply(
        &self,
        parent_id: &CommentId,
        text: &str,
        mention: Option<&AuthorRef>,
    ) -> Result<MutationOutcome<Reply>> {
        self.loader.ensure_live()?;
        let body = validate_body(text)?;
        let target = self
            .resolve_reply_target(parent_id)
            .ok_or_else(|| ValidationError::UnknownTarget(parent_id.to_string()))?;
        let mention = mention.cloned().or(target.mention);
        let parent = target.comment_id;

        let outcome = self
            .mutations
            .submit(
                ThreadMutation::Post,
                self.api.post_reply(
                    &self.activity_id,
                    &parent,
                    &body,
                    mention.as_ref().map(|m| &m.id),
                ),
                |reply: &Reply| {
                    self.loader
                        .update(|cache| cache.append_reply_to(&parent, reply.clone()));
                    self.expanded.lock().insert(parent.clone());
                },
            )
            .await?;

        if let MutationOutcome::Applied(reply) = &outcome {
            info!(activity = %self.activity_id, parent = %parent, reply = %reply.id, "Reply posted");
            self.events.emit(FeedEvent::CommentPosted {
                activity_id: self.activity_id.clone(),
                comment_id: reply.id.clone(),
                is_reply: true,
            });
        }
        Ok(outcome)
    }

    /// Show or hide a comment's replies.  Returns the new state.
    pub fn toggle_reply_visibility(&self, comment_id: &CommentId) -> bool {
        let mut expanded = self.expanded.lock();
        if expanded.remove(comment_id) {
            false
        } else {
            expanded.insert(comment_id.clone());
            true
        }
    }

    pub fn is_expanded(&self, comment_id: &CommentId) -> bool {
        self.expanded.lock().contains(comment_id)
    }

    // -- Composer -----------------------------------------------------------

    pub fn composer(&self) -> Composer {
        self.composer.lock().clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.composer.lock().draft = text.into();
    }

    /// Address the next submission to `comment_id` (a comment or a reply).
    pub fn start_reply(&self, comment_id: &CommentId) -> Result<ReplyTarget> {
        let target = self
            .resolve_reply_target(comment_id)
            .ok_or_else(|| ValidationError::UnknownTarget(comment_id.to_string()))?;
        self.composer.lock().replying_to = Some(target.clone());
        Ok(target)
    }

    pub fn cancel_reply(&self) {
        self.composer.lock().replying_to = None;
    }

    /// Post the composer's draft, as a reply when one is being written.
    ///
    /// Once the post lands the composer is cleared, unless it was edited
    /// while the request was in flight.  On failure it is left untouched.
    pub async fn submit(&self) -> Result<()> {
        let submitted = self.composer();
        let posted = match &submitted.replying_to {
            Some(target) => self
                .post_reply(&target.comment_id, &submitted.draft, target.mention.as_ref())
                .await?
                .applied()
                .is_some(),
            None => self.post_comment(&submitted.draft).await?.applied().is_some(),
        };
        if posted {
            self.clear_composer(&submitted);
        }
        Ok(())
    }

    fn clear_composer(&self, submitted: &Composer) {
        let mut composer = self.composer.lock();
        if *composer == *submitted {
            *composer = Composer::default();
        }
    }

    fn resolve_reply_target(&self, id: &CommentId) -> Option<ReplyTarget> {
        self.loader.with_cache(|cache| {
            let owner = cache.owner_of(id)?;
            Some(ReplyTarget {
                comment_id: owner.id.clone(),
                mention: owner.reply(id).map(|r| r.author.clone()),
            })
        })
    }

    // -- Accessors ----------------------------------------------------------

    pub fn items(&self) -> Vec<Comment> {
        self.loader.items()
    }

    pub fn get(&self, id: &CommentId) -> Option<Comment> {
        self.loader.get(id)
    }

    pub fn pagination(&self) -> Pagination {
        self.loader.pagination()
    }

    pub fn is_posting(&self) -> bool {
        self.mutations.is_pending(&ThreadMutation::Post)
    }

    pub fn teardown(&self) {
        self.loader.teardown();
        self.mutations.teardown();
        self.expanded.lock().clear();
        debug!(activity = %self.activity_id, "Comment thread torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.loader.is_torn_down()
    }
}

#[async_trait]
impl PageSource for CommentThread {
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

fn validate_body(text: &str) -> Result<String> {
    let body = text.trim();
    if body.is_empty() {
        return Err(ValidationError::EmptyBody.into());
    }
    let len = body.chars().count();
    if len > MAX_COMMENT_LENGTH {
        return Err(ValidationError::BodyTooLong {
            len,
            max: MAX_COMMENT_LENGTH,
        }
        .into());
    }
    Ok(body.to_string())
}

fn like_state_of(cache: &EntityCache<Comment>, id: &CommentId) -> Option<ToggleCount> {
    let owner = cache.owner_of(id)?;
    if &owner.id == id {
        Some(owner.like_state())
    } else {
        owner.reply(id).map(Reply::like_state)
    }
}

fn set_like_state_of(cache: &mut EntityCache<Comment>, id: &CommentId, state: ToggleCount) {
    let Some(owner_id) = cache.owner_of(id).map(|c| c.id.clone()) else {
        return;
    };
    cache.replace_one(&owner_id, |owner| {
        if &owner.id == id {
            owner.set_like_state(state);
        } else if let Some(reply) = owner.reply_mut(id) {
            reply.set_like_state(state);
        }
    });
}
