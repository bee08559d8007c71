//! Data source contracts the pager fetches from

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

/// Source addressed by numeric offset.
///
/// A fetch returns at most `page_size` items; a short or empty result means
/// the source is exhausted from that offset on.
#[async_trait]
pub trait OffsetSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Fetch up to `page_size` items starting at `offset`
    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<Self::Item>>;

    /// Get the source name
    fn source_name(&self) -> &str {
        "offset source"
    }
}

/// Source addressed by "resume after this identifier".
#[async_trait]
pub trait CursorSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;
    type Id: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Fetch up to `page_size` items following `last_id`, or from the beginning when `None`
    async fn fetch_after(
        &self,
        last_id: Option<&Self::Id>,
        page_size: usize,
    ) -> anyhow::Result<Vec<Self::Item>>;

    /// Identifier of an item; must be pure and deterministic
    fn id_of(&self, item: &Self::Item) -> Self::Id;

    /// Get the source name
    fn source_name(&self) -> &str {
        "cursor source"
    }
}

#[async_trait]
impl<S: OffsetSource + ?Sized> OffsetSource for Arc<S> {
    type Item = S::Item;

    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<Self::Item>> {
        (**self).fetch(offset, page_size).await
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}

#[async_trait]
impl<S: CursorSource + ?Sized> CursorSource for Arc<S> {
    type Item = S::Item;
    type Id = S::Id;

    async fn fetch_after(
        &self,
        last_id: Option<&Self::Id>,
        page_size: usize,
    ) -> anyhow::Result<Vec<Self::Item>> {
        (**self).fetch_after(last_id, page_size).await
    }

    fn id_of(&self, item: &Self::Item) -> Self::Id {
        (**self).id_of(item)
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}
