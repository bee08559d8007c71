//! Sources shared by the unit tests

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::source::{CursorSource, OffsetSource};

/// Offset source over `0..len` that records every fetched offset
pub(crate) struct CountingSource {
    items: Vec<u32>,
    pub calls: Mutex<Vec<usize>>,
    pub fail_at: Mutex<Option<usize>>,
    gate: Option<Arc<Semaphore>>,
}

impl CountingSource {
    pub fn new(len: u32) -> Self {
        Self {
            items: (0..len).collect(),
            calls: Mutex::new(Vec::new()),
            fail_at: Mutex::new(None),
            gate: None,
        }
    }

    /// Every fetch waits for one permit of `gate`
    pub fn gated(len: u32, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(len)
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl OffsetSource for CountingSource {
    type Item = u32;

    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<u32>> {
        self.calls.lock().push(offset);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if *self.fail_at.lock() == Some(offset) {
            anyhow::bail!("source unavailable at offset {}", offset);
        }
        let start = offset.min(self.items.len());
        let end = (offset + page_size).min(self.items.len());
        Ok(self.items[start..end].to_vec())
    }
}

/// Cursor source over a mutable list of ids, resuming after the position of the cursor
pub(crate) struct ListSource {
    pub items: Mutex<Vec<u32>>,
    pub calls: Mutex<Vec<Option<u32>>>,
}

impl ListSource {
    pub fn new(items: Vec<u32>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Option<u32>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CursorSource for ListSource {
    type Item = u32;
    type Id = u32;

    async fn fetch_after(&self, last_id: Option<&u32>, page_size: usize) -> anyhow::Result<Vec<u32>> {
        self.calls.lock().push(last_id.copied());
        let items = self.items.lock();
        let start = match last_id {
            None => 0,
            Some(id) => match items.iter().position(|item| item == id) {
                Some(position) => position + 1,
                None => return Ok(Vec::new()),
            },
        };
        Ok(items.iter().skip(start).take(page_size).copied().collect())
    }

    fn id_of(&self, item: &u32) -> u32 {
        *item
    }
}
