//! Records held by the feed caches.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it can be decoded straight from the API's JSON bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityId, CommentId, GoalId, ToggleCount, UserId};

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// The user who produced an activity, comment or reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: UserId,
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    GoalCreated,
    GoalCompleted,
    GoalUpdated,
    SubgoalCreated,
    SubgoalCompleted,
    HabitCreated,
    HabitCompleted,
    HabitStreak,
    MilestoneReached,
    /// Any kind this client does not know yet.  Serializes as `"other"`.
    #[serde(other)]
    Other,
}

/// Kind-specific payload.  Which fields are set depends on the
/// [`ActivityKind`]; absent fields decode as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    #[serde(default)]
    pub goal_id: Option<GoalId>,
    #[serde(default)]
    pub goal_title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subgoal_title: Option<String>,
    #[serde(default)]
    pub habit_title: Option<String>,
    #[serde(default)]
    pub streak: Option<u32>,
    #[serde(default)]
    pub milestone: Option<String>,
    /// Goal progress in percent.
    #[serde(default)]
    pub progress: Option<u8>,
}

/// An event produced by a user, shown in the activity feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub user: AuthorRef,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub data: ActivityData,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

impl Activity {
    pub fn like_state(&self) -> ToggleCount {
        ToggleCount::new(self.is_liked, self.like_count)
    }

    pub fn set_like_state(&mut self, state: ToggleCount) {
        self.is_liked = state.active;
        self.like_count = state.count;
    }

    /// One-line description, e.g. `Ada completed "Run a marathon"`.
    pub fn summary(&self) -> String {
        let who = &self.user.display_name;
        let goal = self.data.goal_title.as_deref().unwrap_or("a goal");
        match self.kind {
            ActivityKind::GoalCreated => format!("{who} created \"{goal}\""),
            ActivityKind::GoalCompleted => format!("{who} completed \"{goal}\""),
            ActivityKind::GoalUpdated => match self.data.progress {
                Some(p) => format!("{who} is {p}% through \"{goal}\""),
                None => format!("{who} updated \"{goal}\""),
            },
            ActivityKind::SubgoalCreated => format!(
                "{who} added \"{}\" to \"{goal}\"",
                self.data.subgoal_title.as_deref().unwrap_or("a step")
            ),
            ActivityKind::SubgoalCompleted => format!(
                "{who} finished \"{}\" in \"{goal}\"",
                self.data.subgoal_title.as_deref().unwrap_or("a step")
            ),
            ActivityKind::HabitCreated => format!(
                "{who} started the habit \"{}\"",
                self.data.habit_title.as_deref().unwrap_or("a habit")
            ),
            ActivityKind::HabitCompleted => format!(
                "{who} checked in on \"{}\"",
                self.data.habit_title.as_deref().unwrap_or("a habit")
            ),
            ActivityKind::HabitStreak => format!(
                "{who} is on a {}-day streak with \"{}\"",
                self.data.streak.unwrap_or(0),
                self.data.habit_title.as_deref().unwrap_or("a habit")
            ),
            ActivityKind::MilestoneReached => format!(
                "{who} reached \"{}\" on \"{goal}\"",
                self.data.milestone.as_deref().unwrap_or("a milestone")
            ),
            ActivityKind::Other => match self.data.goal_title.as_deref() {
                Some(goal) => format!("{who} posted an update on \"{goal}\""),
                None => format!("{who} posted an update"),
            },
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// A top-level comment on an activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub author: AuthorRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub is_liked: bool,
    /// Replies in the order they were posted.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Comment {
    pub fn like_state(&self) -> ToggleCount {
        ToggleCount::new(self.is_liked, self.like_count)
    }

    pub fn set_like_state(&mut self, state: ToggleCount) {
        self.is_liked = state.active;
        self.like_count = state.count;
    }

    pub fn reply(&self, id: &CommentId) -> Option<&Reply> {
        self.replies.iter().find(|r| &r.id == id)
    }

    pub fn reply_mut(&mut self, id: &CommentId) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| &r.id == id)
    }
}

/// A reply to a top-level comment.  Replies cannot themselves be replied to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: CommentId,
    pub parent_id: CommentId,
    pub author: AuthorRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub is_liked: bool,
    /// The user this reply is addressed to, if any.
    #[serde(default)]
    pub mention: Option<AuthorRef>,
}

impl Reply {
    pub fn like_state(&self) -> ToggleCount {
        ToggleCount::new(self.is_liked, self.like_count)
    }

    pub fn set_like_state(&mut self, state: ToggleCount) {
        self.is_liked = state.active;
        self.like_count = state.count;
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A suggested user in the discover list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverUser {
    pub id: UserId,
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_following: bool,
    #[serde(default)]
    pub followers_count: u32,
    #[serde(default)]
    pub goals_count: u32,
}

impl DiscoverUser {
    pub fn follow_state(&self) -> ToggleCount {
        ToggleCount::new(self.is_following, self.followers_count)
    }

    pub fn set_follow_state(&mut self, state: ToggleCount) {
        self.is_following = state.active;
        self.followers_count = state.count;
    }
}
