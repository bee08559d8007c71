//! Bidirectional windowed pagination engine
//!
//! A [`Pager`] keeps a bounded, ordered window of pages fetched from a data
//! source, grows it at either edge on demand, evicts pages from the opposite
//! edge once the window is full, and republishes a flattened, transformed
//! view of the resident items after every change.
//!
//! Pages are addressed either by numeric offset ([`OffsetStrategy`]) or by
//! the identifier of the last item seen ([`CursorStrategy`]). All window
//! mutations run on a single consumer task; callers only enqueue requests and
//! read published snapshots.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod page;
pub mod pager;
pub mod source;
pub mod status;
pub mod strategy;
pub mod transform;
pub mod window;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use cache::{CacheEntry, PageCache};
pub use config::{FetchMode, PagerConfig};
pub use error::{ConfigError, PagerError, Result};
pub use events::{EventBus, PagerEvent};
pub use page::{FetchKey, Page, PageNumber};
pub use pager::Pager;
pub use source::{CursorSource, OffsetSource};
pub use status::PagerStatus;
pub use strategy::{CursorStrategy, FetchStrategy, OffsetStrategy};
pub use transform::{Identity, PageHeaders, Projection, Row, Transform};
pub use window::{Edge, LoadOutcome, PagedView, SkipReason, Window, WindowManager};
