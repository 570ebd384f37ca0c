//! Ordered, duplicate-free entity storage.
//!
//! A feed's cache keeps its records in display order and guarantees that
//! every id appears at most once.  Paginated results only enter through
//! [`EntityCache::merge`], which keeps the first-seen copy of each id.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use stride_shared::{Activity, ActivityId, Comment, CommentId, DiscoverUser, Reply, UserId};

/// A record with a stable identifier.
pub trait Identified {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> &Self::Id;
}

impl Identified for Activity {
    type Id = ActivityId;

    fn id(&self) -> &ActivityId {
        &self.id
    }
}

impl Identified for Comment {
    type Id = CommentId;

    fn id(&self) -> &CommentId {
        &self.id
    }
}

impl Identified for DiscoverUser {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Ordered in-memory store for one feed.
#[derive(Debug, Clone)]
pub struct EntityCache<T: Identified> {
    items: Vec<T>,
}

impl<T: Identified> EntityCache<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole sequence, dropping later duplicates from `items`.
    pub fn reset(&mut self, items: Vec<T>) {
        let mut seen = HashSet::new();
        self.items = items
            .into_iter()
            .filter(|item| seen.insert(item.id().clone()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append the items of `incoming` whose id is not cached yet, in incoming
    /// order.  Merging the same page twice leaves the cache as merging it
    /// once did.  Returns how many items were added.
    pub fn merge(&mut self, incoming: Vec<T>) -> usize {
        let mut seen: HashSet<T::Id> = self.items.iter().map(|item| item.id().clone()).collect();
        let before = self.items.len();
        for item in incoming {
            if seen.insert(item.id().clone()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    /// Apply `updater` to the entity with the given id.  Returns `false` when
    /// no such entity is cached.
    pub fn replace_one<F>(&mut self, id: &T::Id, updater: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                updater(item);
                true
            }
            None => false,
        }
    }

    /// Insert at the front, replacing any cached copy with the same id.
    pub fn prepend(&mut self, item: T) {
        self.items.retain(|existing| existing.id() != item.id());
        self.items.insert(0, item);
    }
}

impl<T: Identified> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache<Comment> {
    /// Append `reply` to the replies of `parent_id`.  Returns `false` when
    /// the parent is not cached; no other comment is touched.
    pub fn append_reply_to(&mut self, parent_id: &CommentId, mut reply: Reply) -> bool {
        reply.parent_id = parent_id.clone();
        self.replace_one(parent_id, |parent| {
            parent.replies.retain(|existing| existing.id != reply.id);
            parent.replies.push(reply);
        })
    }

    /// Find the comment that owns `id`, either as itself or as one of its
    /// replies.
    pub fn owner_of(&self, id: &CommentId) -> Option<&Comment> {
        self.items
            .iter()
            .find(|c| &c.id == id || c.reply(id).is_some())
    }
}
