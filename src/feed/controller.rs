//! Incremental pagination over a single feed source.
//!
//! A [`FeedController`] owns the accumulated items of one view, the cursor of
//! the last page and a status flag. At most one fetch is in flight at a time;
//! a call to [`FeedController::load_more`] while one is running returns
//! [`LoadOutcome::Busy`] without reaching the fetcher. Resetting bumps a
//! generation counter so a response that was requested before the reset is
//! dropped instead of merged. Dropping a `load_more` future mid-fetch returns
//! the controller to `Idle`, so a cancelled request never wedges the view.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::classify::{classify, ClassificationFilter};
use super::fetcher::{FeedSource, PageFetcher};
use super::model::FeedEntry;
use crate::error::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Fetching,
    Exhausted,
    Error,
}

/// Result of a [`FeedController::load_more`] call.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A page was merged; `added` counts items that were not already present.
    Loaded { added: usize },
    /// The last page was reached (possibly by this call).
    Exhausted { added: usize },
    /// Another fetch is in flight; nothing was requested.
    Busy,
    /// The feed was reset while the request was in flight; the page was dropped.
    Stale,
    Failed(FeedError),
}

struct FeedState<T> {
    items: Vec<T>,
    seen: HashSet<String>,
    cursor: Option<String>,
    status: LoadStatus,
    generation: u64,
    filter: ClassificationFilter,
    /// Whether any page has been applied since the last reset.
    started: bool,
    /// When the last page was merged.
    loaded_at: Option<Instant>,
    last_error: Option<String>,
}

impl<T> FeedState<T> {
    fn new(filter: ClassificationFilter) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            status: LoadStatus::Idle,
            generation: 0,
            filter,
            started: false,
            loaded_at: None,
            last_error: None,
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.cursor = None;
        self.status = LoadStatus::Idle;
        self.generation += 1;
        self.started = false;
        self.loaded_at = None;
        self.last_error = None;
    }
}

/// Puts a fetch that never completed back to `Idle`.
///
/// Armed for the duration of the request in [`FeedController::load_more`];
/// if the future is dropped at the `.await`, the guard runs instead of the
/// merge. A reset in the meantime already moved the state on, so a guard
/// from an older generation does nothing.
struct FetchGuard<'a, T> {
    state: &'a Mutex<FeedState<T>>,
    generation: u64,
    armed: bool,
}

impl<T> FetchGuard<'_, T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for FetchGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation && state.status == LoadStatus::Fetching {
            state.status = LoadStatus::Idle;
            debug!(generation = self.generation, "Fetch cancelled, feed back to idle");
        }
    }
}

/// Point-in-time view of a controller, classified by its active filter.
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    pub items: Vec<T>,
    /// Items accumulated before classification.
    pub total: usize,
    pub status: LoadStatus,
    pub filter: ClassificationFilter,
    pub has_next_page: bool,
    pub started: bool,
    pub error: Option<String>,
    /// Identifier of the last visible item, used as the scroll sentinel.
    pub sentinel: Option<String>,
    pub generation: u64,
}

impl<T> FeedSnapshot<T> {
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.status == LoadStatus::Fetching
    }
}

/// Pagination state machine for one feed view.
pub struct FeedController<T> {
    source: FeedSource,
    fetcher: Arc<dyn PageFetcher<T>>,
    limit: u32,
    state: Mutex<FeedState<T>>,
}

impl<T: FeedEntry> FeedController<T> {
    #[must_use]
    pub fn new(
        source: FeedSource,
        fetcher: Arc<dyn PageFetcher<T>>,
        limit: u32,
        filter: ClassificationFilter,
    ) -> Self {
        Self {
            source,
            fetcher,
            limit,
            state: Mutex::new(FeedState::new(filter)),
        }
    }

    #[must_use]
    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, FeedState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch and merge the next page.
    ///
    /// The lock is released while the request is in flight; concurrent
    /// callers observe `Fetching` and return [`LoadOutcome::Busy`].
    pub async fn load_more(&self) -> LoadOutcome {
        let (generation, cursor) = {
            let mut state = self.lock();
            match state.status {
                LoadStatus::Fetching => return LoadOutcome::Busy,
                LoadStatus::Exhausted => return LoadOutcome::Exhausted { added: 0 },
                LoadStatus::Idle | LoadStatus::Error => {}
            }
            state.status = LoadStatus::Fetching;
            (state.generation, state.cursor.clone())
        };
        let mut guard = FetchGuard {
            state: &self.state,
            generation,
            armed: true,
        };

        debug!(source = %self.source, cursor = ?cursor, "Fetching page");
        let result = self
            .fetcher
            .fetch(&self.source, self.limit, cursor.as_deref())
            .await;
        guard.disarm();

        let mut state = self.lock();
        if state.generation != generation {
            debug!(source = %self.source, "Dropping page fetched before reset");
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                state.started = true;
                state.loaded_at = Some(Instant::now());
                state.last_error = None;
                let exhausted = page.is_last();
                let empty = page.items.is_empty();
                let mut added = 0;
                for item in page.items {
                    if state.seen.insert(item.entry_id().to_string()) {
                        state.items.push(item);
                        added += 1;
                    }
                }
                // An empty page keeps the cursor of the last non-empty one.
                if !empty || !exhausted {
                    state.cursor = page.cursor;
                }
                if exhausted {
                    state.status = LoadStatus::Exhausted;
                    info!(source = %self.source, total = state.items.len(), "Feed exhausted");
                    LoadOutcome::Exhausted { added }
                } else {
                    state.status = LoadStatus::Idle;
                    debug!(source = %self.source, added, total = state.items.len(), "Page merged");
                    LoadOutcome::Loaded { added }
                }
            }
            Err(e) => {
                warn!(source = %self.source, cursor = ?cursor, "Failed to load page: {e}");
                state.status = LoadStatus::Error;
                state.last_error = Some(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Load the first page if nothing has been fetched since the last reset.
    pub async fn ensure_loaded(&self) -> Option<LoadOutcome> {
        let needs_load = {
            let state = self.lock();
            !state.started && state.status == LoadStatus::Idle
        };
        if needs_load {
            Some(self.load_more().await)
        } else {
            None
        }
    }

    /// Drop all items and the cursor and return to `Idle`.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.clear();
        debug!(source = %self.source, generation = state.generation, "Feed reset");
    }

    /// Switch the classification filter, resetting the feed when it changes.
    ///
    /// Returns whether a reset happened.
    pub fn set_filter(&self, filter: ClassificationFilter) -> bool {
        let mut state = self.lock();
        if state.filter == filter {
            return false;
        }
        state.filter = filter;
        state.clear();
        debug!(source = %self.source, %filter, "Filter changed, feed reset");
        true
    }

    /// Whether the last merged page is older than `ttl`.
    ///
    /// Feeds that never loaded, or are fetching right now, are not stale.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let state = self.lock();
        state.status != LoadStatus::Fetching
            && state.loaded_at.is_some_and(|at| at.elapsed() >= ttl)
    }

    #[must_use]
    pub fn filter(&self) -> ClassificationFilter {
        self.lock().filter
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.lock().status
    }

    /// Whether another page may exist.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.lock().status != LoadStatus::Exhausted
    }

    #[must_use]
    pub fn cursor(&self) -> Option<String> {
        self.lock().cursor.clone()
    }

    /// All accumulated items, unfiltered, in arrival order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot<T> {
        let state = self.lock();
        let items = classify(&state.items, state.filter);
        let sentinel = items.last().map(|item| item.entry_id().to_string());
        FeedSnapshot {
            total: state.items.len(),
            items,
            status: state.status,
            filter: state.filter,
            has_next_page: state.status != LoadStatus::Exhausted,
            started: state.started,
            error: state.last_error.clone(),
            sentinel,
            generation: state.generation,
        }
    }
}
