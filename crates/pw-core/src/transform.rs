//! Presentation transforms applied to the flattened window

use std::ops::RangeInclusive;

use crate::page::PageNumber;

/// Displayable projection of the flattened window plus bookkeeping deltas
#[derive(Debug, Clone, PartialEq)]
pub struct Projection<R> {
    pub items: Vec<R>,
    /// Items added (or removed, if negative) relative to the flattened input
    pub total_size_change: i64,
    /// Same delta, per resident page in page-number order
    pub per_page_size_changes: Vec<i64>,
}

impl<R> Projection<R> {
    /// Projection that adds nothing to its input
    pub fn unchanged(items: Vec<R>, pages: Option<&RangeInclusive<PageNumber>>) -> Self {
        Self {
            items,
            total_size_change: 0,
            per_page_size_changes: vec![0; page_count(pages)],
        }
    }
}

/// Number of pages in an optional range
pub fn page_count(pages: Option<&RangeInclusive<PageNumber>>) -> usize {
    pages.map_or(0, |range| (range.end() - range.start() + 1).max(0) as usize)
}

/// Pure mapping from `(loaded page range, flattened items)` to a projection.
///
/// Runs synchronously on the pager's consumer task after every window change.
pub trait Transform<T>: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn apply(
        &self,
        pages: Option<RangeInclusive<PageNumber>>,
        items: Vec<T>,
    ) -> Projection<Self::Output>;
}

/// Publishes the flattened items as they are
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: Clone + Send + Sync + 'static> Transform<T> for Identity {
    type Output = T;

    fn apply(&self, pages: Option<RangeInclusive<PageNumber>>, items: Vec<T>) -> Projection<T> {
        Projection::unchanged(items, pages.as_ref())
    }
}

impl<T, R, F> Transform<T> for F
where
    F: Fn(Option<RangeInclusive<PageNumber>>, Vec<T>) -> Projection<R> + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    type Output = R;

    fn apply(&self, pages: Option<RangeInclusive<PageNumber>>, items: Vec<T>) -> Projection<R> {
        self(pages, items)
    }
}

/// Row of a [`PageHeaders`] projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<T> {
    Header(PageNumber),
    Item(T),
}

/// Inserts a header row before every page.
///
/// Page boundaries are recovered from the page size: every resident page but
/// the last is assumed full. A short page in the middle of the window (a
/// cursor page refetched after the source lost items, or a backward preload
/// over a shrunken source) shifts every later header, so use it only where
/// pages other than the last are always full, such as offset paging over a
/// stable source.
#[derive(Debug, Clone, Copy)]
pub struct PageHeaders {
    page_size: usize,
}

impl PageHeaders {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Transform<T> for PageHeaders {
    type Output = Row<T>;

    fn apply(&self, pages: Option<RangeInclusive<PageNumber>>, items: Vec<T>) -> Projection<Row<T>> {
        let Some(range) = pages else {
            return Projection::unchanged(items.into_iter().map(Row::Item).collect(), None);
        };

        let count = page_count(Some(&range));
        let mut rows = Vec::with_capacity(items.len() + count);
        let mut items = items.into_iter();
        for page_number in range {
            rows.push(Row::Header(page_number));
            rows.extend(items.by_ref().take(self.page_size).map(Row::Item));
        }
        // anything past the last page boundary still belongs to the last page
        rows.extend(items.map(Row::Item));

        Projection {
            items: rows,
            total_size_change: count as i64,
            per_page_size_changes: vec![1; count],
        }
    }
}
