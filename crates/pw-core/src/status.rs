//! Pager status state machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current activity of a pager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PagerStatus {
    /// Quiescent; new loads are accepted
    #[default]
    Idle,
    /// Window is being rebuilt from scratch
    Refreshing,
    /// A page is being loaded before the first resident page
    LoadingAtStart,
    /// A page is being loaded after the last resident page
    LoadingAtEnd,
}

impl PagerStatus {
    pub fn is_idle(self) -> bool {
        self == PagerStatus::Idle
    }

    pub fn is_loading(self) -> bool {
        !self.is_idle()
    }
}

impl fmt::Display for PagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PagerStatus::Idle => "idle",
            PagerStatus::Refreshing => "refreshing",
            PagerStatus::LoadingAtStart => "loading at start",
            PagerStatus::LoadingAtEnd => "loading at end",
        };
        f.write_str(name)
    }
}
