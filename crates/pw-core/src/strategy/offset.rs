//! Offset-addressed paging

use async_trait::async_trait;

use super::FetchStrategy;
use crate::config::FetchMode;
use crate::page::{FetchKey, PageNumber};
use crate::source::OffsetSource;
use crate::window::{Edge, Window};

/// Pages keyed by `page_number * page_size`.
///
/// Offsets are stable, so no cache is kept.
pub struct OffsetStrategy<S> {
    source: S,
}

impl<S: OffsetSource> OffsetStrategy<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: OffsetSource + 'static> FetchStrategy for OffsetStrategy<S> {
    type Item = S::Item;
    type Id = ();

    fn mode(&self) -> FetchMode {
        FetchMode::Offset
    }

    fn compute_next_key(
        &self,
        page_number: PageNumber,
        _edge: Edge,
        _window: &Window<Self::Item, Self::Id>,
        page_size: usize,
    ) -> Option<FetchKey<Self::Id>> {
        let page = usize::try_from(page_number).ok()?;
        page.checked_mul(page_size).map(FetchKey::Offset)
    }

    fn validate_candidate(
        &self,
        _page_number: PageNumber,
        key: &FetchKey<Self::Id>,
        window: &Window<Self::Item, Self::Id>,
    ) -> bool {
        !window.contains_key(key)
    }

    async fn fetch(
        &self,
        key: &FetchKey<Self::Id>,
        page_size: usize,
    ) -> anyhow::Result<Vec<Self::Item>> {
        match key {
            FetchKey::Offset(offset) => self.source.fetch(*offset, page_size).await,
            FetchKey::Cursor(_) => anyhow::bail!("offset strategy cannot fetch by cursor"),
        }
    }

    fn source_name(&self) -> &str {
        self.source.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    struct Numbers;

    #[async_trait]
    impl OffsetSource for Numbers {
        type Item = usize;

        async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<usize>> {
            Ok((offset..(offset + page_size).min(10)).collect())
        }
    }

    #[test]
    fn test_key_is_page_times_size() {
        let strategy = OffsetStrategy::new(Numbers);
        let window = Window::new();

        assert_eq!(
            strategy.compute_next_key(4, Edge::End, &window, 3),
            Some(FetchKey::Offset(12))
        );
        assert_eq!(strategy.compute_next_key(-1, Edge::Start, &window, 3), None);
        assert_eq!(strategy.start_page(7), 7);
    }

    #[test]
    fn test_resident_offset_is_rejected() {
        let strategy = OffsetStrategy::new(Numbers);
        let mut window = Window::new();
        window.push_back(Page::new(1, 3, vec![3, 4, 5], FetchKey::Offset(3)));

        assert!(!strategy.validate_candidate(1, &FetchKey::Offset(3), &window));
        assert!(strategy.validate_candidate(2, &FetchKey::Offset(6), &window));
    }

    #[tokio::test]
    async fn test_fetch_by_offset() {
        let strategy = OffsetStrategy::new(Numbers);
        assert_eq!(strategy.fetch(&FetchKey::Offset(9), 3).await.unwrap(), vec![9]);
        assert!(strategy.fetch(&FetchKey::Cursor(None), 3).await.is_err());
    }
}
