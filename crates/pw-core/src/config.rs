//! Pager configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::page::PageNumber;

/// How pages are addressed at the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// `(offset, page_size)` queries
    Offset,
    /// `(last_seen_id, page_size)` queries
    Cursor,
}

/// Static configuration for one pager instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Items requested per fetch
    pub page_size: usize,

    /// Maximum number of resident pages
    pub max_pages: usize,

    /// Pages fetched around the start page on refresh
    pub preload_count: usize,

    /// First page loaded on refresh (offset mode only, cursor mode always starts at 0)
    pub start_page: PageNumber,

    /// Reject cursors found anywhere in the cache, not only on resident pages
    pub thorough_duplicate_check: bool,

    /// Capacity of the action queue
    pub queue_capacity: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 5,
            preload_count: 1,
            start_page: 0,
            thorough_duplicate_check: false,
            queue_capacity: 16,
        }
    }
}

impl PagerConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_preload_count(mut self, preload_count: usize) -> Self {
        self.preload_count = preload_count;
        self
    }

    pub fn with_start_page(mut self, start_page: PageNumber) -> Self {
        self.start_page = start_page;
        self
    }

    pub fn with_thorough_duplicate_check(mut self, enabled: bool) -> Self {
        self.thorough_duplicate_check = enabled;
        self
    }

    /// Check the configuration for the given fetch mode
    pub fn validate(&self, mode: FetchMode) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroMaxPages);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.start_page < 0 {
            return Err(ConfigError::NegativeStartPage(self.start_page));
        }

        let overflow = ConfigError::PageRangeOverflow {
            start_page: self.start_page,
            preload_count: self.preload_count,
        };
        let needed = self.refresh_footprint(mode).ok_or_else(|| overflow.clone())?;
        if needed > self.max_pages {
            return Err(ConfigError::PreloadExceedsWindow {
                needed,
                max_pages: self.max_pages,
            });
        }

        // the last page a refresh can touch must still be a valid page number
        let start = match mode {
            FetchMode::Offset => self.start_page,
            FetchMode::Cursor => 0,
        };
        PageNumber::try_from(self.preload_count)
            .ok()
            .and_then(|preload| start.checked_add(preload))
            .ok_or(overflow)?;
        Ok(())
    }

    /// Most pages a refresh can load in the given mode, `None` if that overflows
    pub fn refresh_footprint(&self, mode: FetchMode) -> Option<usize> {
        let forward = self.preload_count.checked_add(1)?;
        let backward = match mode {
            FetchMode::Offset => {
                let start = usize::try_from(self.start_page.max(0)).unwrap_or(usize::MAX);
                self.preload_count.min(start)
            }
            FetchMode::Cursor => 0,
        };
        forward.checked_add(backward)
    }
}
