//! Cursor ("resume after last id") paging

use async_trait::async_trait;
use tracing::debug;

use super::FetchStrategy;
use crate::cache::PageCache;
use crate::config::FetchMode;
use crate::page::{FetchKey, Page, PageNumber};
use crate::source::CursorSource;
use crate::window::{Edge, Window};

/// Pages keyed by the identifier of the last item before them.
///
/// Cursors come from runtime data rather than stable offsets, so every page
/// number's cursor and seen identifiers are kept in the window's cache. An
/// evicted page can then be fetched again with exactly the cursor it was
/// first fetched with.
pub struct CursorStrategy<S> {
    source: S,
    thorough: bool,
}

impl<S: CursorSource> CursorStrategy<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            thorough: false,
        }
    }

    /// Also reject cursors found anywhere in the cache, tombstones included
    pub fn with_thorough_check(mut self, thorough: bool) -> Self {
        self.thorough = thorough;
        self
    }

    pub fn is_thorough(&self) -> bool {
        self.thorough
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: CursorSource + 'static> FetchStrategy for CursorStrategy<S> {
    type Item = S::Item;
    type Id = S::Id;

    fn mode(&self) -> FetchMode {
        FetchMode::Cursor
    }

    fn start_page(&self, _configured: PageNumber) -> PageNumber {
        0
    }

    fn compute_next_key(
        &self,
        page_number: PageNumber,
        edge: Edge,
        window: &Window<Self::Item, Self::Id>,
        _page_size: usize,
    ) -> Option<FetchKey<Self::Id>> {
        if let Some(entry) = window.cache().get(page_number) {
            return Some(FetchKey::Cursor(entry.fetch_cursor.clone()));
        }

        match edge {
            // Nothing before an uncached page tells us where it begins.
            Edge::Start => None,
            Edge::End if page_number == 0 => Some(FetchKey::Cursor(None)),
            Edge::End => {
                let previous = window.get(page_number - 1)?;
                let last = previous.last_item()?;
                Some(FetchKey::Cursor(Some(self.source.id_of(last))))
            }
        }
    }

    fn validate_candidate(
        &self,
        page_number: PageNumber,
        key: &FetchKey<Self::Id>,
        window: &Window<Self::Item, Self::Id>,
    ) -> bool {
        if window.contains_key(key) {
            return false;
        }
        if !self.thorough {
            return true;
        }

        let Some(id) = key.cursor() else {
            return true;
        };
        let cache = window.cache();
        if cache.cursor_used_elsewhere(id, page_number) {
            debug!("Cursor {:?} already used by another page", id);
            return false;
        }
        if cache.id_seen_elsewhere(id, page_number - 1) {
            debug!("Cursor {:?} already shown outside page {}", id, page_number - 1);
            return false;
        }
        true
    }

    async fn fetch(
        &self,
        key: &FetchKey<Self::Id>,
        page_size: usize,
    ) -> anyhow::Result<Vec<Self::Item>> {
        match key {
            FetchKey::Cursor(last_id) => self.source.fetch_after(last_id.as_ref(), page_size).await,
            FetchKey::Offset(_) => anyhow::bail!("cursor strategy cannot fetch by offset"),
        }
    }

    fn on_loaded(&self, page: &Page<Self::Item, Self::Id>, cache: &mut PageCache<Self::Id>) {
        let cursor = match page.fetch_key() {
            FetchKey::Cursor(cursor) => cursor.clone(),
            FetchKey::Offset(_) => None,
        };
        let ids = page.items().iter().map(|item| self.source.id_of(item)).collect();
        cache.record(page.page_number(), cursor, ids);
    }

    fn on_evicted(&self, page: &Page<Self::Item, Self::Id>, cache: &mut PageCache<Self::Id>) {
        cache.tombstone(page.page_number());
    }

    fn source_name(&self) -> &str {
        self.source.source_name()
    }
}
