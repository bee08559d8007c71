//! In-memory keyset source

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pw_core::CursorSource;

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Items ordered by key, served "after key".
///
/// The contents can change between fetches, which is what cursor paging is
/// meant to survive: a fetch resumes strictly after the given key whether or
/// not that key is still present.
pub struct KeyedMemorySource<K, T> {
    name: String,
    items: RwLock<BTreeMap<K, T>>,
    key_of: KeyFn<T, K>,
}

impl<K, T> KeyedMemorySource<K, T>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create a new keyed source
    pub fn new<F>(items: impl IntoIterator<Item = T>, key_of: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let items = items
            .into_iter()
            .map(|item| (key_of(&item), item))
            .collect();
        Self {
            name: "keyed memory".to_string(),
            items: RwLock::new(items),
            key_of: Arc::new(key_of),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Insert or replace an item
    pub fn insert(&self, item: T) -> Option<T> {
        let key = (self.key_of)(&item);
        self.items.write().insert(key, item)
    }

    /// Remove the item with `key`
    pub fn remove(&self, key: &K) -> Option<T> {
        self.items.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl<K, T> CursorSource for KeyedMemorySource<K, T>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Item = T;
    type Id = K;

    async fn fetch_after(&self, last_id: Option<&K>, page_size: usize) -> anyhow::Result<Vec<T>> {
        let lower = match last_id {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let items = self.items.read();
        Ok(items
            .range((lower, Bound::Unbounded))
            .take(page_size)
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn id_of(&self, item: &T) -> K {
        (self.key_of)(item)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Message {
        id: u64,
        body: String,
    }

    fn message(id: u64) -> Message {
        Message {
            id,
            body: format!("message {}", id),
        }
    }

    #[tokio::test]
    async fn test_fetch_after_key() {
        let source = KeyedMemorySource::new((0..10).map(message), |m: &Message| m.id);

        let first = source.fetch_after(None, 3).await.unwrap();
        assert_eq!(first.iter().map(|m| m.id).collect::<Vec<_>>(), vec![0, 1, 2]);

        let next = source.fetch_after(Some(&2), 3).await.unwrap();
        assert_eq!(next.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(source.id_of(&next[0]), 3);
    }

    #[tokio::test]
    async fn test_resumes_after_removed_key() {
        let source = KeyedMemorySource::new((0..10).map(message), |m: &Message| m.id);
        source.remove(&2);
        source.insert(message(20));

        let next = source.fetch_after(Some(&2), 3).await.unwrap();
        assert_eq!(next.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(source.len(), 10);
    }
}
