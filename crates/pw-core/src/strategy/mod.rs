//! Fetch strategies: how pages are keyed, validated and fetched

mod cursor;
mod offset;

pub use cursor::CursorStrategy;
pub use offset::OffsetStrategy;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::cache::PageCache;
use crate::config::FetchMode;
use crate::page::{FetchKey, Page, PageNumber};
use crate::window::{Edge, Window};

/// Policy plugged into the window manager.
///
/// The window manager decides *which* page number to load; the strategy
/// decides which key addresses it, whether that key may be loaded given what
/// is already resident, and how to fetch it.
#[async_trait]
pub trait FetchStrategy: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;
    type Id: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn mode(&self) -> FetchMode;

    /// Page a refresh starts from, given the configured start page
    fn start_page(&self, configured: PageNumber) -> PageNumber {
        configured
    }

    /// Key addressing `page_number` when inserted at `edge`, or `None` when it
    /// cannot be derived from the current window
    fn compute_next_key(
        &self,
        page_number: PageNumber,
        edge: Edge,
        window: &Window<Self::Item, Self::Id>,
        page_size: usize,
    ) -> Option<FetchKey<Self::Id>>;

    /// Whether `key` may be loaded as `page_number` without duplicating data
    fn validate_candidate(
        &self,
        page_number: PageNumber,
        key: &FetchKey<Self::Id>,
        window: &Window<Self::Item, Self::Id>,
    ) -> bool;

    /// Fetch the items addressed by `key`
    async fn fetch(
        &self,
        key: &FetchKey<Self::Id>,
        page_size: usize,
    ) -> anyhow::Result<Vec<Self::Item>>;

    /// Called after `page` joined the window
    fn on_loaded(&self, _page: &Page<Self::Item, Self::Id>, _cache: &mut PageCache<Self::Id>) {}

    /// Called after `page` left the window
    fn on_evicted(&self, _page: &Page<Self::Item, Self::Id>, _cache: &mut PageCache<Self::Id>) {}

    fn source_name(&self) -> &str;
}
