//! In-memory offset source

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use pw_core::OffsetSource;

/// Items held in a vector, served by offset
pub struct MemorySource<T> {
    name: String,
    items: RwLock<Vec<T>>,
    latency: Option<Duration>,
}

impl<T: Clone + Send + Sync + 'static> MemorySource<T> {
    /// Create a new in-memory source
    pub fn new(items: Vec<T>) -> Self {
        Self {
            name: "memory".to_string(),
            items: RwLock::new(items),
            latency: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay every fetch, to mimic a remote source
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append an item
    pub fn push(&self, item: T) {
        self.items.write().push(item);
    }

    /// Remove and return the item at `index`, if any
    pub fn remove(&self, index: usize) -> Option<T> {
        let mut items = self.items.write();
        (index < items.len()).then(|| items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> OffsetSource for MemorySource<T> {
    type Item = T;

    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<T>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let items = self.items.read();
        Ok(items.iter().skip(offset).take(page_size).cloned().collect())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
