//! Page data unit

use std::fmt;

/// Page numbers are signed; loads never go below page 0.
pub type PageNumber = i64;

/// Key a page was fetched with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKey<Id> {
    /// Numeric offset (`page_number * page_size`)
    Offset(usize),
    /// Identifier of the last item seen before this page, `None` for the beginning
    Cursor(Option<Id>),
}

impl<Id> FetchKey<Id> {
    /// Cursor carried by this key, if it is a cursor key with an identifier
    pub fn cursor(&self) -> Option<&Id> {
        match self {
            FetchKey::Cursor(Some(id)) => Some(id),
            _ => None,
        }
    }
}

impl<Id: fmt::Debug> fmt::Display for FetchKey<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKey::Offset(offset) => write!(f, "offset {}", offset),
            FetchKey::Cursor(Some(id)) => write!(f, "after {:?}", id),
            FetchKey::Cursor(None) => write!(f, "from start"),
        }
    }
}

/// One fetched batch of items.
///
/// Pages are immutable once created; the window replaces them wholesale.
#[derive(Debug, Clone)]
pub struct Page<T, Id> {
    page_number: PageNumber,
    requested_size: usize,
    items: Vec<T>,
    fetch_key: FetchKey<Id>,
}

impl<T, Id> Page<T, Id> {
    pub fn new(
        page_number: PageNumber,
        requested_size: usize,
        items: Vec<T>,
        fetch_key: FetchKey<Id>,
    ) -> Self {
        Self {
            page_number,
            requested_size,
            items,
            fetch_key,
        }
    }

    pub fn page_number(&self) -> PageNumber {
        self.page_number
    }

    pub fn requested_size(&self) -> usize {
        self.requested_size
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn fetch_key(&self) -> &FetchKey<Id> {
        &self.fetch_key
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A page that came back short means the source is exhausted in that direction
    pub fn is_full(&self) -> bool {
        self.items.len() == self.requested_size
    }

    pub fn last_item(&self) -> Option<&T> {
        self.items.last()
    }
}
