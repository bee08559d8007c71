//! Errors raised by the pager

use thiserror::Error;

use crate::page::PageNumber;

/// Configuration rejected at construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page size must be positive")]
    ZeroPageSize,

    #[error("max pages must be positive")]
    ZeroMaxPages,

    #[error("queue capacity must be positive")]
    ZeroQueueCapacity,

    #[error("start page must not be negative (got {0})")]
    NegativeStartPage(PageNumber),

    #[error("refresh would load {needed} pages but the window holds at most {max_pages}")]
    PreloadExceedsWindow { needed: usize, max_pages: usize },

    #[error("start page {start_page} with preload {preload_count} leaves the page number range")]
    PageRangeOverflow {
        start_page: PageNumber,
        preload_count: usize,
    },
}

/// Errors that can occur in pager operations
#[derive(Error, Debug)]
pub enum PagerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("fetching page {page_number} failed: {source}")]
    Fetch {
        page_number: PageNumber,
        #[source]
        source: anyhow::Error,
    },

    #[error("pager has been shut down")]
    Closed,
}

pub type Result<T, E = PagerError> = std::result::Result<T, E>;
