use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Server-issued identifier of an activity.
    ActivityId
);
string_id!(
    /// Server-issued identifier of a comment or reply.
    CommentId
);
string_id!(
    /// Server-issued identifier of a user.
    UserId
);
string_id!(GoalId);

/// One page of a paginated collection as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total page count, when the endpoint reports it.
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_pages: Option<u32>) -> Self {
        Self { items, total_pages }
    }
}

/// An on/off flag paired with the counter it drives: `isLiked` + `likeCount`
/// on activities and comments, `isFollowing` + `followersCount` on users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleCount {
    pub active: bool,
    pub count: u32,
}

/// The change actually applied by [`ToggleCount::toggle`], kept so that a
/// rollback can undo exactly that change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedToggle {
    pub was_active: bool,
    pub delta: i64,
}

impl ToggleCount {
    pub fn new(active: bool, count: u32) -> Self {
        Self { active, count }
    }

    /// Flip the flag and move the counter one step in the same direction.
    /// The counter never goes below zero, so the recorded delta may be 0.
    pub fn toggle(self) -> (Self, AppliedToggle) {
        let active = !self.active;
        let count = if active {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        let applied = AppliedToggle {
            was_active: self.active,
            delta: i64::from(count) - i64::from(self.count),
        };
        (Self { active, count }, applied)
    }

    /// Undo a previously applied toggle on the current value.
    pub fn revert(self, applied: AppliedToggle) -> Self {
        let count = (i64::from(self.count) - applied.delta).clamp(0, i64::from(u32::MAX));
        Self {
            active: applied.was_active,
            count: count as u32,
        }
    }
}
