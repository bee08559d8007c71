//! End-to-end scenarios driven through the public `Pager` handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pw_core::{
    CursorSource, OffsetSource, PageHeaders, Pager, PagerConfig, PagerEvent, PagerStatus, Row,
};

/// Offset source over `0..len` recording each requested offset.
struct Numbers {
    len: u32,
    offsets: Mutex<Vec<usize>>,
}

impl Numbers {
    fn new(len: u32) -> Arc<Self> {
        Arc::new(Self {
            len,
            offsets: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl OffsetSource for Numbers {
    type Item = u32;

    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<u32>> {
        self.offsets.lock().push(offset);
        let start = (offset as u32).min(self.len);
        let end = (offset as u32 + page_size as u32).min(self.len);
        Ok((start..end).collect())
    }
}

/// Keyset source over ascending ids recording each requested cursor.
struct Ascending {
    len: u32,
    cursors: Mutex<Vec<Option<u32>>>,
}

#[async_trait]
impl CursorSource for Ascending {
    type Item = u32;
    type Id = u32;

    async fn fetch_after(&self, last_id: Option<&u32>, page_size: usize) -> anyhow::Result<Vec<u32>> {
        self.cursors.lock().push(last_id.copied());
        let start = last_id.map_or(0, |id| id + 1);
        Ok((start..self.len).take(page_size).collect())
    }

    fn id_of(&self, item: &u32) -> u32 {
        *item
    }
}

fn config() -> PagerConfig {
    PagerConfig::default()
        .with_page_size(3)
        .with_max_pages(3)
        .with_preload_count(0)
}

/// Issue a load and wait for it to settle.
async fn next(pager: &Pager<u32>) {
    assert!(pager.load_next().await.unwrap());
    pager.wait_idle().await.unwrap();
}

async fn previous(pager: &Pager<u32>) {
    assert!(pager.load_previous().await.unwrap());
    pager.wait_idle().await.unwrap();
}

#[tokio::test]
async fn test_ten_items_three_per_page() {
    let source = Numbers::new(10);
    let pager = Pager::offset(source.clone(), pw_core::Identity, config()).unwrap();
    pager.wait_idle().await.unwrap();
    assert_eq!(pager.view().items, vec![0, 1, 2]);

    next(&pager).await;
    assert_eq!(pager.view().items, vec![0, 1, 2, 3, 4, 5]);

    next(&pager).await;
    assert_eq!(pager.view().pages, Some(0..=2));

    let mut events = pager.subscribe_events();
    next(&pager).await;
    let view = pager.view();
    assert_eq!(view.pages, Some(1..=3));
    assert_eq!(view.items, vec![3, 4, 5, 6, 7, 8, 9]);

    assert_eq!(
        events.recv().await.unwrap(),
        PagerEvent::PageLoaded {
            page_number: 3,
            edge: pw_core::Edge::End,
            item_count: 1,
            full: false,
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        PagerEvent::PageEvicted {
            page_number: 0,
            edge: pw_core::Edge::Start,
        }
    );

    // exhausted: accepted by the status gate, but nothing is fetched
    next(&pager).await;
    assert_eq!(source.offsets.lock().len(), 4);
    assert_eq!(pager.view().pages, Some(1..=3));
}

#[tokio::test]
async fn test_previous_at_start_page_zero_is_a_no_op() {
    let source = Numbers::new(10);
    let pager = Pager::offset(source.clone(), pw_core::Identity, config()).unwrap();
    pager.wait_idle().await.unwrap();

    previous(&pager).await;
    assert_eq!(*source.offsets.lock(), vec![0]);
    assert_eq!(pager.view().pages, Some(0..=0));
    assert_eq!(pager.status(), PagerStatus::Idle);
}

#[tokio::test]
async fn test_cursor_refetch_after_eviction_uses_same_cursor() {
    let source = Arc::new(Ascending {
        len: 30,
        cursors: Mutex::new(Vec::new()),
    });
    let pager = Pager::cursor(source.clone(), pw_core::Identity, config().with_max_pages(2))
        .unwrap();
    pager.wait_idle().await.unwrap();

    next(&pager).await;
    next(&pager).await;
    next(&pager).await;
    assert_eq!(pager.view().pages, Some(2..=3));

    previous(&pager).await;
    previous(&pager).await;
    assert_eq!(pager.view().pages, Some(0..=1));
    assert_eq!(pager.view().items, vec![0, 1, 2, 3, 4, 5]);

    let cursors = source.cursors.lock().clone();
    assert_eq!(
        cursors,
        vec![None, Some(2), Some(5), Some(8), Some(2), None]
    );
}

#[tokio::test]
async fn test_window_never_exceeds_max_pages() {
    let source = Numbers::new(200);
    let config = config().with_start_page(10);
    let pager = Pager::offset(source, pw_core::Identity, config).unwrap();
    pager.wait_idle().await.unwrap();

    for step in 0..20 {
        if step % 3 == 0 {
            previous(&pager).await;
        } else {
            next(&pager).await;
        }
        let pages = pager.view().pages.clone().unwrap();
        assert!(pages.end() - pages.start() + 1 <= 3);
        assert_eq!(pager.view().len(), (pages.end() - pages.start() + 1) as usize * 3);
    }
}

#[tokio::test]
async fn test_header_rows_track_the_window() {
    let source = Numbers::new(10);
    let pager: Pager<Row<u32>> =
        Pager::offset(source, PageHeaders::new(3), config().with_preload_count(1)).unwrap();
    pager.wait_idle().await.unwrap();

    let view = pager.view();
    assert_eq!(view.pages, Some(0..=1));
    assert_eq!(view.items.len(), 8);
    assert_eq!(view.items[0], Row::Header(0));
    assert_eq!(view.items[4], Row::Header(1));
    assert_eq!(view.total_size_change, 2);
}
