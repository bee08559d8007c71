//! Window manager: resident pages, eviction and publishing

use std::collections::VecDeque;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cache::PageCache;
use crate::config::PagerConfig;
use crate::error::{PagerError, Result};
use crate::events::{EventBus, PagerEvent};
use crate::page::{FetchKey, Page, PageNumber};
use crate::strategy::FetchStrategy;
use crate::transform::{Projection, Transform};

/// Edge of the window a page is inserted at or evicted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

impl Edge {
    pub fn opposite(self) -> Self {
        match self {
            Edge::Start => Edge::End,
            Edge::End => Edge::Start,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Start => f.write_str("start"),
            Edge::End => f.write_str("end"),
        }
    }
}

/// Why a load did not fetch anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The page is already resident
    AlreadyLoaded,
    /// The edge page came back short; the source has nothing further
    Exhausted,
    /// No cached cursor for a backward cursor load (known limitation)
    CacheMiss,
    /// The strategy rejected the key as overlapping loaded data
    Duplicate,
    /// The page number would leave a gap in the window
    NotAdjacent,
    /// There is no edge page to extend from
    EmptyWindow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::AlreadyLoaded => "already loaded",
            SkipReason::Exhausted => "source exhausted",
            SkipReason::CacheMiss => "no cached cursor",
            SkipReason::Duplicate => "duplicate key",
            SkipReason::NotAdjacent => "not adjacent to window",
            SkipReason::EmptyWindow => "window is empty",
        };
        f.write_str(reason)
    }
}

/// Result of a window operation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Refreshed,
    Skipped(SkipReason),
}

impl LoadOutcome {
    pub fn is_loaded(self) -> bool {
        matches!(self, LoadOutcome::Loaded | LoadOutcome::Refreshed)
    }
}

/// Snapshot published after every window change
#[derive(Debug, Clone, PartialEq)]
pub struct PagedView<R> {
    pub items: Vec<R>,
    pub total_size_change: i64,
    pub per_page_size_changes: Vec<i64>,
    /// Page range the view was computed from, `None` for an empty window
    pub pages: Option<RangeInclusive<PageNumber>>,
}

impl<R> PagedView<R> {
    fn new(projection: Projection<R>, pages: Option<RangeInclusive<PageNumber>>) -> Self {
        Self {
            items: projection.items,
            total_size_change: projection.total_size_change,
            per_page_size_changes: projection.per_page_size_changes,
            pages,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered, contiguous run of resident pages plus the cursor cache
#[derive(Debug, Clone)]
pub struct Window<T, Id> {
    pages: VecDeque<Page<T, Id>>,
    cache: PageCache<Id>,
}

impl<T, Id: Clone + PartialEq> Window<T, Id> {
    pub(crate) fn new() -> Self {
        Self {
            pages: VecDeque::new(),
            cache: PageCache::new(),
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page<T, Id>> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn first(&self) -> Option<&Page<T, Id>> {
        self.pages.front()
    }

    pub fn last(&self) -> Option<&Page<T, Id>> {
        self.pages.back()
    }

    /// Resident page with the given number
    pub fn get(&self, page_number: PageNumber) -> Option<&Page<T, Id>> {
        let first = self.first()?.page_number();
        let index = usize::try_from(page_number.checked_sub(first)?).ok()?;
        self.pages.get(index)
    }

    /// Whether any resident page was fetched with `key`
    pub fn contains_key(&self, key: &FetchKey<Id>) -> bool {
        self.pages.iter().any(|page| page.fetch_key() == key)
    }

    pub fn page_range(&self) -> Option<RangeInclusive<PageNumber>> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => Some(first.page_number()..=last.page_number()),
            _ => None,
        }
    }

    pub fn page_numbers(&self) -> Vec<PageNumber> {
        self.pages.iter().map(Page::page_number).collect()
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    pub fn cache(&self) -> &PageCache<Id> {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut PageCache<Id> {
        &mut self.cache
    }

    pub(crate) fn push_front(&mut self, page: Page<T, Id>) {
        self.pages.push_front(page);
    }

    pub(crate) fn push_back(&mut self, page: Page<T, Id>) {
        self.pages.push_back(page);
    }

    pub(crate) fn pop_front(&mut self) -> Option<Page<T, Id>> {
        self.pages.pop_front()
    }

    pub(crate) fn pop_back(&mut self) -> Option<Page<T, Id>> {
        self.pages.pop_back()
    }
}

impl<T: Clone, Id> Window<T, Id> {
    /// All resident items in page-number order
    pub fn flatten(&self) -> Vec<T> {
        self.pages
            .iter()
            .flat_map(|page| page.items().iter().cloned())
            .collect()
    }
}

/// Owns the window and applies every mutation to it.
///
/// Not shared: the pager's consumer task holds the only instance, and
/// readers observe the [`PagedView`] snapshots it publishes.
pub struct WindowManager<S: FetchStrategy, X: Transform<S::Item>> {
    strategy: S,
    transform: X,
    config: PagerConfig,
    window: Window<S::Item, S::Id>,
    view: watch::Sender<Arc<PagedView<X::Output>>>,
    events: EventBus,
}

impl<S: FetchStrategy, X: Transform<S::Item>> WindowManager<S, X> {
    /// Create a manager with an empty window; fails on invalid configuration
    pub fn new(strategy: S, transform: X, config: PagerConfig) -> Result<Self> {
        config.validate(strategy.mode())?;

        let initial = PagedView::new(transform.apply(None, Vec::new()), None);
        let (view, _) = watch::channel(Arc::new(initial));

        Ok(Self {
            strategy,
            transform,
            config,
            window: Window::new(),
            view,
            events: EventBus::new(),
        })
    }

    pub fn window(&self) -> &Window<S::Item, S::Id> {
        &self.window
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Latest published view
    pub fn view(&self) -> Arc<PagedView<X::Output>> {
        self.view.borrow().clone()
    }

    /// Observe published views
    pub fn subscribe(&self) -> watch::Receiver<Arc<PagedView<X::Output>>> {
        self.view.subscribe()
    }

    /// Rebuild the window from the configured start page
    pub async fn refresh(&mut self) -> Result<LoadOutcome> {
        let start = self.strategy.start_page(self.config.start_page);
        self.refresh_from(start).await
    }

    /// Discard the window and load `start_page` plus preloaded neighbours.
    ///
    /// Forward preload stops at the first short page; backward preload always
    /// attempts the full count down to page 0. The new window and cache are
    /// built aside and only swapped in once every fetch succeeded.
    pub async fn refresh_from(&mut self, start_page: PageNumber) -> Result<LoadOutcome> {
        let start = start_page.max(0);
        let preload = PageNumber::try_from(self.config.preload_count).unwrap_or(PageNumber::MAX);
        let page_size = self.config.page_size;
        info!(
            "Refreshing '{}' from page {} (preload {})",
            self.strategy.source_name(),
            start,
            preload
        );

        let mut staged = Window::new();
        for page_number in start..=start.saturating_add(preload) {
            let Some(key) = self
                .strategy
                .compute_next_key(page_number, Edge::End, &staged, page_size)
            else {
                break;
            };
            if !self.strategy.validate_candidate(page_number, &key, &staged) {
                warn!("Refresh stopped at page {}: duplicate key {}", page_number, key);
                break;
            }

            let page = self.fetch_page(page_number, key).await?;
            let full = page.is_full();
            self.strategy.on_loaded(&page, staged.cache_mut());
            staged.push_back(page);
            if !full {
                debug!("Page {} came back short, forward preload stops", page_number);
                break;
            }
        }

        let floor = start.saturating_sub(preload).max(0);
        for page_number in (floor..start).rev() {
            let Some(key) = self
                .strategy
                .compute_next_key(page_number, Edge::Start, &staged, page_size)
            else {
                break;
            };
            let page = self.fetch_page(page_number, key).await?;
            self.strategy.on_loaded(&page, staged.cache_mut());
            staged.push_front(page);
        }

        self.window = staged;
        let pages = self.window.page_range();
        info!("Refreshed window: pages {:?}, {} items", pages, self.window.item_count());
        self.events.publish(PagerEvent::Refreshed { pages });
        self.publish();
        Ok(LoadOutcome::Refreshed)
    }

    /// Load the page before the first resident page, clamped at page 0
    pub async fn load_previous(&mut self) -> Result<LoadOutcome> {
        let Some(first) = self.window.first() else {
            return Ok(self.skip(None, SkipReason::EmptyWindow));
        };
        let target = (first.page_number() - 1).max(0);
        self.load_page_at_start(target).await
    }

    /// Load the page after the last resident page
    pub async fn load_next(&mut self) -> Result<LoadOutcome> {
        let Some(last) = self.window.last() else {
            return Ok(self.skip(None, SkipReason::EmptyWindow));
        };
        let Some(target) = last.page_number().checked_add(1) else {
            return Ok(self.skip(None, SkipReason::Exhausted));
        };
        self.load_page_at_end(target).await
    }

    /// Prepend `page_number`, evicting the last page on overflow.
    ///
    /// In cursor mode this needs a cached cursor for the page. A miss on page 0
    /// refreshes the window; a miss on any other page is skipped, since there
    /// is no stable way to find where that page begins.
    pub async fn load_page_at_start(&mut self, page_number: PageNumber) -> Result<LoadOutcome> {
        if let Some(first) = self.window.first() {
            if page_number != first.page_number() - 1 {
                let reason = if self.window.get(page_number).is_some() {
                    SkipReason::AlreadyLoaded
                } else {
                    SkipReason::NotAdjacent
                };
                return Ok(self.skip(Some(page_number), reason));
            }
        }

        let page_size = self.config.page_size;
        let Some(key) = self
            .strategy
            .compute_next_key(page_number, Edge::Start, &self.window, page_size)
        else {
            if page_number == 0 {
                info!("No cached cursor for page 0, refreshing");
                return self.refresh_from(0).await;
            }
            warn!(
                "No cached cursor for page {}; backward loads of uncached pages are not supported",
                page_number
            );
            return Ok(self.skip(Some(page_number), SkipReason::CacheMiss));
        };
        if !self.strategy.validate_candidate(page_number, &key, &self.window) {
            return Ok(self.skip(Some(page_number), SkipReason::Duplicate));
        }

        let page = self.fetch_page(page_number, key).await?;
        self.insert(page, Edge::Start);
        Ok(LoadOutcome::Loaded)
    }

    /// Append `page_number`, evicting the first page on overflow.
    ///
    /// Skipped when the last page is short, i.e. the source is exhausted.
    pub async fn load_page_at_end(&mut self, page_number: PageNumber) -> Result<LoadOutcome> {
        let Some(last) = self.window.last() else {
            return Ok(self.skip(Some(page_number), SkipReason::EmptyWindow));
        };
        if last.page_number().checked_add(1) != Some(page_number) {
            let reason = if self.window.get(page_number).is_some() {
                SkipReason::AlreadyLoaded
            } else {
                SkipReason::NotAdjacent
            };
            return Ok(self.skip(Some(page_number), reason));
        }
        if !last.is_full() {
            return Ok(self.skip(Some(page_number), SkipReason::Exhausted));
        }

        let page_size = self.config.page_size;
        let Some(key) = self
            .strategy
            .compute_next_key(page_number, Edge::End, &self.window, page_size)
        else {
            return Ok(self.skip(Some(page_number), SkipReason::CacheMiss));
        };
        if !self.strategy.validate_candidate(page_number, &key, &self.window) {
            return Ok(self.skip(Some(page_number), SkipReason::Duplicate));
        }

        let page = self.fetch_page(page_number, key).await?;
        self.insert(page, Edge::End);
        Ok(LoadOutcome::Loaded)
    }

    async fn fetch_page(
        &self,
        page_number: PageNumber,
        key: FetchKey<S::Id>,
    ) -> Result<Page<S::Item, S::Id>> {
        let page_size = self.config.page_size;
        debug!("Fetching page {} ({})", page_number, key);

        let mut items = match self.strategy.fetch(&key, page_size).await {
            Ok(items) => items,
            Err(source) => {
                error!("Failed to fetch page {}: {:#}", page_number, source);
                self.events.publish(PagerEvent::FetchFailed {
                    page_number,
                    message: format!("{:#}", source),
                });
                return Err(PagerError::Fetch {
                    page_number,
                    source,
                });
            }
        };

        if items.len() > page_size {
            warn!(
                "Source returned {} items for page {} (page size {}), dropping the surplus",
                items.len(),
                page_number,
                page_size
            );
            items.truncate(page_size);
        }
        Ok(Page::new(page_number, page_size, items, key))
    }

    fn insert(&mut self, page: Page<S::Item, S::Id>, edge: Edge) {
        let page_number = page.page_number();
        let item_count = page.len();
        let full = page.is_full();

        self.strategy.on_loaded(&page, self.window.cache_mut());
        match edge {
            Edge::Start => self.window.push_front(page),
            Edge::End => self.window.push_back(page),
        }
        debug!("Loaded page {} at {} ({} items)", page_number, edge, item_count);
        self.events.publish(PagerEvent::PageLoaded {
            page_number,
            edge,
            item_count,
            full,
        });

        if self.window.len() > self.config.max_pages {
            let evicted_from = edge.opposite();
            let evicted = match evicted_from {
                Edge::Start => self.window.pop_front(),
                Edge::End => self.window.pop_back(),
            };
            if let Some(evicted) = evicted {
                self.strategy.on_evicted(&evicted, self.window.cache_mut());
                debug!("Evicted page {} from {}", evicted.page_number(), evicted_from);
                self.events.publish(PagerEvent::PageEvicted {
                    page_number: evicted.page_number(),
                    edge: evicted_from,
                });
            }
        }

        self.publish();
    }

    fn skip(&self, page_number: Option<PageNumber>, reason: SkipReason) -> LoadOutcome {
        debug!("Skipping load of page {:?}: {}", page_number, reason);
        self.events.publish(PagerEvent::LoadSkipped {
            page_number,
            reason,
        });
        LoadOutcome::Skipped(reason)
    }

    fn publish(&self) {
        let pages = self.window.page_range();
        let projection = self.transform.apply(pages.clone(), self.window.flatten());
        self.view.send_replace(Arc::new(PagedView::new(projection, pages)));
    }
}
