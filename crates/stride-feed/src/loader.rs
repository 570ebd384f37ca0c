//! Page-by-page retrieval for one feed.
//!
//! The loader owns the feed's [`EntityCache`] and [`PageCursor`].  First-page
//! loads replace the cache; later pages are merged.  Only one load is in
//! flight at a time, so pages are merged in the order they were requested.
//!
//! A generation counter is bumped by every reset, forced refresh and
//! teardown.  A fetch that resolves under an older generation is dropped
//! instead of being merged into a feed it no longer belongs to.

use std::future::Future;

use parking_lot::Mutex;
use tracing::{debug, warn};

use stride_shared::{ApiResult, Page};

use crate::cache::{EntityCache, Identified};
use crate::cursor::{PageCursor, Pagination};
use crate::error::{FeedError, Result};
use crate::events::{EventSink, FeedEvent};

/// Items and pagination state after a load.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Result of a load-more request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The page was fetched and merged.
    Appended { page: u32, added: usize, has_more: bool },
    /// Nothing was requested: no more pages, a load is already in flight,
    /// or the first page has not been loaded yet.
    Skipped,
    /// The page arrived after the feed was reset or torn down and was
    /// discarded.
    Stale,
}

struct LoaderState<T: Identified> {
    cache: EntityCache<T>,
    cursor: PageCursor,
    loading: bool,
    loading_more: bool,
    last_error: Option<String>,
    generation: u64,
    torn_down: bool,
}

impl<T: Identified + Clone> LoaderState<T> {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.cursor.page(),
            total_pages: self.cursor.total_pages(),
            has_more: self.cursor.has_more(),
            loading: self.loading,
            loading_more: self.loading_more,
            last_error: self.last_error.clone(),
        }
    }

    fn snapshot(&self) -> FeedSnapshot<T> {
        FeedSnapshot {
            items: self.cache.items().to_vec(),
            pagination: self.pagination(),
        }
    }
}

/// Which in-flight flag a [`LoadingFlag`] owns.
#[derive(Debug, Clone, Copy)]
enum LoadKind {
    First,
    More,
}

/// Clears the in-flight flag when a load's future is dropped before the
/// fetch resolves (timeout, `select!`, aborted task).  Does nothing once the
/// feed has moved to a newer generation.
struct LoadingFlag<'a, T: Identified> {
    state: &'a Mutex<LoaderState<T>>,
    generation: u64,
    kind: LoadKind,
    armed: bool,
}

impl<'a, T: Identified> LoadingFlag<'a, T> {
    fn new(state: &'a Mutex<LoaderState<T>>, generation: u64, kind: LoadKind) -> Self {
        Self {
            state,
            generation,
            kind,
            armed: true,
        }
    }

    /// The fetch resolved; the caller settles the flag itself.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T: Identified> Drop for LoadingFlag<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.generation != self.generation {
            return;
        }
        match self.kind {
            LoadKind::First => state.loading = false,
            LoadKind::More => state.loading_more = false,
        }
    }
}

/// Paginated collection loader for one feed.
pub struct PaginatedLoader<T: Identified> {
    feed: &'static str,
    state: Mutex<LoaderState<T>>,
    events: EventSink,
}

impl<T: Identified + Clone> PaginatedLoader<T> {
    pub fn new(feed: &'static str, events: EventSink) -> Self {
        Self {
            feed,
            state: Mutex::new(LoaderState {
                cache: EntityCache::new(),
                cursor: PageCursor::new(),
                loading: false,
                loading_more: false,
                last_error: None,
                generation: 0,
                torn_down: false,
            }),
            events,
        }
    }

    /// Fetch page 1 and replace the cache with it.
    ///
    /// When the feed is already loaded (or its first load is in flight) and
    /// `force_refresh` is false, the current snapshot is returned without a
    /// fetch.  On failure the cache and cursor are left as they were.
    pub async fn load_first_page<F, Fut>(
        &self,
        fetch: F,
        page_size: u32,
        force_refresh: bool,
    ) -> Result<FeedSnapshot<T>>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = ApiResult<Page<T>>>,
    {
        let generation = {
            let mut state = self.state.lock();
            if state.torn_down {
                return Err(FeedError::TornDown);
            }
            if !force_refresh && (state.cursor.is_loaded() || state.loading) {
                return Ok(state.snapshot());
            }
            state.generation += 1;
            state.loading = true;
            state.loading_more = false;
            state.generation
        };

        let mut flag = LoadingFlag::new(&self.state, generation, LoadKind::First);
        debug!(feed = self.feed, page_size, force_refresh, "Loading first page");
        let result = fetch(1, page_size).await;
        flag.disarm();

        let mut state = self.state.lock();
        if state.torn_down || state.generation != generation {
            debug!(feed = self.feed, "Discarding first page for a stale feed");
            return Ok(state.snapshot());
        }
        state.loading = false;

        match result {
            Ok(page) => {
                let total_pages = page.total_pages;
                state.cache.reset(page.items);
                state.cursor.first_page(total_pages);
                state.last_error = None;
                let snapshot = state.snapshot();
                drop(state);

                debug!(
                    feed = self.feed,
                    items = snapshot.items.len(),
                    has_more = snapshot.pagination.has_more,
                    "First page loaded"
                );
                self.events.emit(FeedEvent::PageLoaded {
                    feed: self.feed.to_string(),
                    page: 1,
                    has_more: snapshot.pagination.has_more,
                });
                Ok(snapshot)
            }
            Err(e) => {
                state.last_error = Some(e.to_string());
                drop(state);

                warn!(feed = self.feed, error = %e, "Failed to load first page");
                self.events.emit(FeedEvent::LoadFailed {
                    feed: self.feed.to_string(),
                    page: 1,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Fetch the next page and merge it into the cache.
    ///
    /// A failure stops pagination for this feed (has-more becomes false)
    /// until the next reset or forced refresh.
    pub async fn load_more<F, Fut>(&self, fetch: F, page_size: u32) -> Result<LoadMore>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = ApiResult<Page<T>>>,
    {
        let (generation, next) = {
            let mut state = self.state.lock();
            if state.torn_down {
                return Err(FeedError::TornDown);
            }
            if !state.cursor.is_loaded()
                || !state.cursor.has_more()
                || state.loading
                || state.loading_more
            {
                return Ok(LoadMore::Skipped);
            }
            state.loading_more = true;
            (state.generation, state.cursor.next_page())
        };

        let mut flag = LoadingFlag::new(&self.state, generation, LoadKind::More);
        debug!(feed = self.feed, page = next, page_size, "Loading next page");
        let result = fetch(next, page_size).await;
        flag.disarm();

        let mut state = self.state.lock();
        if state.torn_down || state.generation != generation {
            debug!(feed = self.feed, page = next, "Discarding page for a stale feed");
            return Ok(LoadMore::Stale);
        }
        state.loading_more = false;

        match result {
            Ok(page) => {
                let added = state.cache.merge(page.items);
                state.cursor.advance(next, page.total_pages);
                state.last_error = None;
                let has_more = state.cursor.has_more();
                drop(state);

                debug!(feed = self.feed, page = next, added, has_more, "Page merged");
                self.events.emit(FeedEvent::PageLoaded {
                    feed: self.feed.to_string(),
                    page: next,
                    has_more,
                });
                Ok(LoadMore::Appended {
                    page: next,
                    added,
                    has_more,
                })
            }
            Err(e) => {
                state.cursor.freeze();
                state.last_error = Some(e.to_string());
                drop(state);

                warn!(feed = self.feed, page = next, error = %e, "Failed to load page, pagination stopped");
                self.events.emit(FeedEvent::LoadFailed {
                    feed: self.feed.to_string(),
                    page: next,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Forget everything fetched so far (filter or tab change).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.cache.clear();
        state.cursor.reset();
        state.loading = false;
        state.loading_more = false;
        state.last_error = None;
    }

    /// Drop the feed.  Anything resolving afterwards is ignored.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        state.torn_down = true;
        state.generation += 1;
        state.cache.clear();
        state.loading = false;
        state.loading_more = false;
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    pub fn ensure_live(&self) -> Result<()> {
        if self.is_torn_down() {
            Err(FeedError::TornDown)
        } else {
            Ok(())
        }
    }

    pub fn items(&self) -> Vec<T> {
        self.state.lock().cache.items().to_vec()
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.state.lock().cache.get(id).cloned()
    }

    pub fn pagination(&self) -> Pagination {
        self.state.lock().pagination()
    }

    pub fn has_more(&self) -> bool {
        let state = self.state.lock();
        !state.torn_down && state.cursor.has_more()
    }

    /// Read the cache.
    pub fn with_cache<R>(&self, f: impl FnOnce(&EntityCache<T>) -> R) -> R {
        f(&self.state.lock().cache)
    }

    /// Mutate the cache.  Returns `None` once the feed is torn down, so late
    /// writes land nowhere.
    pub fn update<R>(&self, f: impl FnOnce(&mut EntityCache<T>) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.torn_down {
            return None;
        }
        Some(f(&mut state.cache))
    }
}
