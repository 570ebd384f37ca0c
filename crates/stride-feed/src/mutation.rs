//! Optimistic mutations with per-key single-flight.
//!
//! Every write to a feed goes through a [`MutationCoordinator`].  Toggles
//! (likes, follows) are applied to the cache before the remote call and are
//! either reconciled with the server's values or rolled back by exactly the
//! delta that was applied.  Submissions (comment and reply posts) are not
//! applied until the server has confirmed them.
//!
//! While a mutation for a key is in flight, further intents for the same key
//! are ignored.  The marker is released by [`PendingGuard`]'s `Drop`, so it
//! is cleared on success, failure and early return alike.

use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use stride_shared::{ApiError, ApiResult, ToggleCount};

use crate::error::{Result, ValidationError};
use crate::events::{EventSink, FeedEvent};

/// Keys with a mutation in flight.
#[derive(Debug)]
pub struct PendingMarkers<K: Eq + Hash> {
    pending: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash + Clone> PendingMarkers<K> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Mark `key` as in flight.  Returns `None` when it already is.
    pub fn try_acquire(&self, key: K) -> Option<PendingGuard<'_, K>> {
        if self.pending.lock().insert(key.clone()) {
            Some(PendingGuard { markers: self, key })
        } else {
            None
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for PendingMarkers<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its key when dropped.
pub struct PendingGuard<'a, K: Eq + Hash> {
    markers: &'a PendingMarkers<K>,
    key: K,
}

impl<K: Eq + Hash> Drop for PendingGuard<'_, K> {
    fn drop(&mut self) {
        self.markers.pending.lock().remove(&self.key);
    }
}

/// What happened to a mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    /// The server confirmed; the cache now holds its values.
    Applied(T),
    /// A mutation for the same key was already in flight; nothing was sent.
    Skipped,
    /// The call resolved after the feed was torn down and was dropped.
    Discarded,
}

impl<T> MutationOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            MutationOutcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}

/// Runs a feed's mutations, one at a time per key.
pub struct MutationCoordinator<K: Eq + Hash> {
    feed: &'static str,
    markers: PendingMarkers<K>,
    torn_down: AtomicBool,
    events: EventSink,
}

impl<K> MutationCoordinator<K>
where
    K: Eq + Hash + Clone + Debug + Display,
{
    pub fn new(feed: &'static str, events: EventSink) -> Self {
        Self {
            feed,
            markers: PendingMarkers::new(),
            torn_down: AtomicBool::new(false),
            events,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.markers.is_pending(key)
    }

    /// Results resolving after this call are discarded.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Optimistically flip a flag/counter pair.
    ///
    /// `read` returns the cached state of the target (or `None` when it is
    /// not cached), `write` stores a new state.  `remote` receives the
    /// intended new flag and returns the server's authoritative state.
    pub async fn toggle<R, W, F, Fut>(
        &self,
        key: K,
        read: R,
        write: W,
        remote: F,
    ) -> Result<MutationOutcome<ToggleCount>>
    where
        R: Fn() -> Option<ToggleCount>,
        W: Fn(ToggleCount),
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = ApiResult<ToggleCount>>,
    {
        let Some(_guard) = self.markers.try_acquire(key.clone()) else {
            debug!(feed = self.feed, key = %key, "Mutation already pending, ignoring");
            return Ok(MutationOutcome::Skipped);
        };

        let before = read().ok_or_else(|| ValidationError::UnknownTarget(key.to_string()))?;
        let (optimistic, applied) = before.toggle();
        write(optimistic);
        debug!(
            feed = self.feed,
            key = %key,
            active = optimistic.active,
            count = optimistic.count,
            "Applied optimistic toggle"
        );

        let result = remote(optimistic.active).await;
        if self.is_torn_down() {
            debug!(feed = self.feed, key = %key, "Feed torn down, dropping toggle result");
            return Ok(MutationOutcome::Discarded);
        }

        match result {
            Ok(server) => {
                if server != optimistic {
                    debug!(
                        feed = self.feed,
                        key = %key,
                        ?optimistic,
                        ?server,
                        "Reconciling optimistic toggle with server state"
                    );
                }
                write(server);
                Ok(MutationOutcome::Applied(server))
            }
            Err(e) => {
                if let Some(current) = read() {
                    write(current.revert(applied));
                }
                self.report_failure(&key, &e);
                Err(e.into())
            }
        }
    }

    /// Send a non-optimistic mutation and apply its confirmed result.
    ///
    /// `apply` only runs after the server accepted the request; nothing is
    /// written to the cache on failure.
    pub async fn submit<T, Fut, A>(&self, key: K, remote: Fut, apply: A) -> Result<MutationOutcome<T>>
    where
        Fut: Future<Output = ApiResult<T>>,
        A: FnOnce(&T),
    {
        let Some(_guard) = self.markers.try_acquire(key.clone()) else {
            debug!(feed = self.feed, key = %key, "Submission already pending, ignoring");
            return Ok(MutationOutcome::Skipped);
        };

        let result = remote.await;
        if self.is_torn_down() {
            debug!(feed = self.feed, key = %key, "Feed torn down, dropping submission result");
            return Ok(MutationOutcome::Discarded);
        }

        match result {
            Ok(value) => {
                apply(&value);
                Ok(MutationOutcome::Applied(value))
            }
            Err(e) => {
                self.report_failure(&key, &e);
                Err(e.into())
            }
        }
    }

    fn report_failure(&self, key: &K, error: &ApiError) {
        warn!(feed = self.feed, key = %key, error = %error, "Mutation failed");
        self.events.emit(FeedEvent::MutationFailed {
            feed: self.feed.to_string(),
            target: key.to_string(),
            error: error.to_string(),
        });
    }
}
