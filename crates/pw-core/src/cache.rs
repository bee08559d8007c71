//! Per-page cursor cache for cursor-mode paging

use ahash::AHashMap;

use crate::page::PageNumber;

/// What the cache remembers about one page number
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<Id> {
    pub page_number: PageNumber,
    /// Cursor the page was first fetched with
    pub fetch_cursor: Option<Id>,
    /// Identifiers observed on the page, cleared on eviction
    pub seen_ids: Vec<Id>,
}

impl<Id> CacheEntry<Id> {
    /// An evicted page keeps its entry with no identifiers
    pub fn is_tombstone(&self) -> bool {
        self.seen_ids.is_empty()
    }
}

/// Cache of cursors and seen identifiers, keyed by page number.
///
/// Entries are never removed while the cache lives; eviction turns them into
/// tombstones so the cursor for that page number can still be resolved.
#[derive(Debug, Clone)]
pub struct PageCache<Id> {
    entries: AHashMap<PageNumber, CacheEntry<Id>>,
}

impl<Id: Clone + PartialEq> PageCache<Id> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Get the entry for a page number
    pub fn get(&self, page_number: PageNumber) -> Option<&CacheEntry<Id>> {
        self.entries.get(&page_number)
    }

    pub fn contains(&self, page_number: PageNumber) -> bool {
        self.entries.contains_key(&page_number)
    }

    /// Record a fetch of `page_number`.
    ///
    /// The first fetch creates the entry; re-fetching an existing page number
    /// appends the newly seen identifiers and keeps the original cursor.
    pub fn record(&mut self, page_number: PageNumber, cursor: Option<Id>, ids: Vec<Id>) {
        self.entries
            .entry(page_number)
            .and_modify(|entry| entry.seen_ids.extend(ids.iter().cloned()))
            .or_insert_with(|| CacheEntry {
                page_number,
                fetch_cursor: cursor,
                seen_ids: ids,
            });
    }

    /// Clear the identifiers of an evicted page, keeping its entry
    pub fn tombstone(&mut self, page_number: PageNumber) {
        if let Some(entry) = self.entries.get_mut(&page_number) {
            entry.seen_ids.clear();
        }
    }

    /// Whether `id` was used as the fetch cursor of any page other than `page_number`
    pub fn cursor_used_elsewhere(&self, id: &Id, page_number: PageNumber) -> bool {
        self.entries.values().any(|entry| {
            entry.page_number != page_number && entry.fetch_cursor.as_ref() == Some(id)
        })
    }

    /// Whether `id` was seen on any page other than `except`
    pub fn id_seen_elsewhere(&self, id: &Id, except: PageNumber) -> bool {
        self.entries
            .values()
            .any(|entry| entry.page_number != except && entry.seen_ids.contains(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry<Id>> {
        self.entries.values()
    }
}

impl<Id: Clone + PartialEq> Default for PageCache<Id> {
    fn default() -> Self {
        Self::new()
    }
}
