//! Pager events broadcast to observers

use std::ops::RangeInclusive;

use tokio::sync::broadcast;

use crate::page::PageNumber;
use crate::window::{Edge, SkipReason};

/// Number of events buffered per receiver before lagging receivers lose the oldest
pub const EVENT_CAPACITY: usize = 64;

/// Something that happened to the window
#[derive(Debug, Clone, PartialEq)]
pub enum PagerEvent {
    /// The window was rebuilt; `pages` is the loaded range, if any
    Refreshed {
        pages: Option<RangeInclusive<PageNumber>>,
    },

    /// A page was inserted at one edge of the window
    PageLoaded {
        page_number: PageNumber,
        edge: Edge,
        item_count: usize,
        full: bool,
    },

    /// A page was dropped to keep the window within bounds
    PageEvicted { page_number: PageNumber, edge: Edge },

    /// A load was requested but nothing was fetched
    LoadSkipped {
        page_number: Option<PageNumber>,
        reason: SkipReason,
    },

    /// The data source failed; the window was left unchanged
    FetchFailed {
        page_number: PageNumber,
        message: String,
    },
}

/// Sending half of the event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PagerEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PagerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: PagerEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
