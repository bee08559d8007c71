//! Pager handle and its single consumer task

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PagerConfig;
use crate::error::{PagerError, Result};
use crate::events::{EventBus, PagerEvent};
use crate::source::{CursorSource, OffsetSource};
use crate::status::PagerStatus;
use crate::strategy::{CursorStrategy, FetchStrategy, OffsetStrategy};
use crate::transform::Transform;
use crate::window::{PagedView, WindowManager};

/// Window mutation requested through the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    LoadAtStart,
    LoadAtEnd,
}

impl Action {
    fn status(self) -> PagerStatus {
        match self {
            Action::Refresh => PagerStatus::Refreshing,
            Action::LoadAtStart => PagerStatus::LoadingAtStart,
            Action::LoadAtEnd => PagerStatus::LoadingAtEnd,
        }
    }
}

/// Status cell plus the number of actions admitted but not yet finished.
///
/// Every status write happens under the `pending` lock, so the status reads
/// `Idle` exactly when no action is running or queued.
struct StatusGate {
    status: watch::Sender<PagerStatus>,
    pending: Mutex<usize>,
}

impl StatusGate {
    /// Gate for a pager whose initial refresh is already under way
    fn refreshing() -> Self {
        let (status, _) = watch::channel(PagerStatus::Refreshing);
        Self {
            status,
            pending: Mutex::new(1),
        }
    }

    fn get(&self) -> PagerStatus {
        *self.status.borrow()
    }

    /// Claim the pager for `target` if it is idle
    fn admit(&self, target: PagerStatus) -> bool {
        let mut pending = self.pending.lock();
        if *pending > 0 {
            return false;
        }
        *pending = 1;
        self.status.send_replace(target);
        true
    }

    /// Count an action in whatever state the pager is in
    fn force(&self, target: PagerStatus) {
        let mut pending = self.pending.lock();
        *pending += 1;
        self.status.send_replace(target);
    }

    /// An action left the queue and starts running
    fn begin(&self, target: PagerStatus) {
        let _pending = self.pending.lock();
        self.status.send_replace(target);
    }

    /// An action finished or was never delivered
    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.status.send_replace(PagerStatus::Idle);
        }
    }

    /// Nothing will run anymore
    fn close(&self) {
        let mut pending = self.pending.lock();
        *pending = 0;
        self.status.send_replace(PagerStatus::Idle);
    }
}

/// Handle to a running pager.
///
/// Requests are queued to one consumer task that owns the window, so at most
/// one mutation runs at a time and mutations apply in submission order.
/// Loads requested while the pager is not idle are dropped here rather than
/// queued; callers re-issue them once the status is back to idle.
pub struct Pager<R> {
    actions: mpsc::Sender<Action>,
    gate: Arc<StatusGate>,
    view: watch::Receiver<Arc<PagedView<R>>>,
    events: EventBus,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl<R: Clone + Send + Sync + 'static> Pager<R> {
    /// Start an offset-addressed pager
    pub fn offset<Src, X>(source: Src, transform: X, config: PagerConfig) -> Result<Self>
    where
        Src: OffsetSource + 'static,
        X: Transform<Src::Item, Output = R>,
    {
        Self::new(OffsetStrategy::new(source), transform, config)
    }

    /// Start a cursor-addressed pager
    pub fn cursor<Src, X>(source: Src, transform: X, config: PagerConfig) -> Result<Self>
    where
        Src: CursorSource + 'static,
        X: Transform<Src::Item, Output = R>,
    {
        let strategy = CursorStrategy::new(source).with_thorough_check(config.thorough_duplicate_check);
        Self::new(strategy, transform, config)
    }

    /// Start a pager over any fetch strategy
    pub fn new<S, X>(strategy: S, transform: X, config: PagerConfig) -> Result<Self>
    where
        S: FetchStrategy,
        X: Transform<S::Item, Output = R>,
    {
        let manager = WindowManager::new(strategy, transform, config)?;
        Ok(Self::spawn(manager))
    }

    /// Hand `manager` to a new consumer task and refresh it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, X>(manager: WindowManager<S, X>) -> Self
    where
        S: FetchStrategy,
        X: Transform<S::Item, Output = R>,
    {
        let (actions, queue) = mpsc::channel(manager.config().queue_capacity);
        let gate = Arc::new(StatusGate::refreshing());
        let view = manager.subscribe();
        let events = manager.events().clone();

        let consumer = tokio::spawn(run(manager, queue, gate.clone()));

        Self {
            actions,
            gate,
            view,
            events,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// Load the page after the window; `Ok(false)` if dropped because the pager is busy
    pub async fn load_next(&self) -> Result<bool> {
        self.request(Action::LoadAtEnd).await
    }

    /// Load the page before the window; `Ok(false)` if dropped because the pager is busy
    pub async fn load_previous(&self) -> Result<bool> {
        self.request(Action::LoadAtStart).await
    }

    /// Rebuild the window; always queued, even while loading
    pub async fn reset(&self) -> Result<()> {
        self.gate.force(PagerStatus::Refreshing);
        self.enqueue(Action::Refresh).await
    }

    /// Cancel the consumer task and any in-flight fetch.
    ///
    /// The published view keeps its last value; later requests fail with
    /// [`PagerError::Closed`].
    pub async fn shutdown(&self) {
        let consumer = self.consumer.lock().take();
        if let Some(consumer) = consumer {
            consumer.abort();
            if let Err(err) = consumer.await {
                if !err.is_cancelled() {
                    warn!("Pager consumer ended abnormally: {}", err);
                }
            }
            info!("Pager shut down");
        }
        self.gate.close();
    }

    pub fn status(&self) -> PagerStatus {
        self.gate.get()
    }

    /// Observe status changes
    pub fn subscribe_status(&self) -> watch::Receiver<PagerStatus> {
        self.gate.status.subscribe()
    }

    /// Latest published view
    pub fn view(&self) -> Arc<PagedView<R>> {
        self.view.borrow().clone()
    }

    /// Observe published views
    pub fn subscribe(&self) -> watch::Receiver<Arc<PagedView<R>>> {
        self.view.clone()
    }

    /// Observe window events, fetch failures included
    pub fn subscribe_events(&self) -> broadcast::Receiver<PagerEvent> {
        self.events.subscribe()
    }

    /// Wait until no action is running or queued
    pub async fn wait_idle(&self) -> Result<()> {
        let mut status = self.gate.status.subscribe();
        status
            .wait_for(|status| status.is_idle())
            .await
            .map_err(|_| PagerError::Closed)?;
        Ok(())
    }

    async fn request(&self, action: Action) -> Result<bool> {
        if !self.gate.admit(action.status()) {
            debug!("Dropping {:?}: pager is {}", action, self.status());
            return Ok(false);
        }

        self.enqueue(action).await?;
        Ok(true)
    }

    async fn enqueue(&self, action: Action) -> Result<()> {
        if self.actions.send(action).await.is_err() {
            self.gate.finish();
            return Err(PagerError::Closed);
        }
        Ok(())
    }
}

/// Marks an action finished when it ends, however it ends
struct FinishOnDrop<'a>(&'a StatusGate);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

async fn run<S, X>(
    mut manager: WindowManager<S, X>,
    mut queue: mpsc::Receiver<Action>,
    gate: Arc<StatusGate>,
) where
    S: FetchStrategy,
    X: Transform<S::Item>,
{
    {
        let _finish = FinishOnDrop(&gate);
        if let Err(err) = manager.refresh().await {
            warn!("Initial refresh failed: {}", err);
        }
    }

    while let Some(action) = queue.recv().await {
        let _finish = FinishOnDrop(&gate);
        gate.begin(action.status());

        let result = match action {
            Action::Refresh => manager.refresh().await,
            Action::LoadAtStart => manager.load_previous().await,
            Action::LoadAtEnd => manager.load_next().await,
        };
        match result {
            Ok(outcome) => debug!("{:?} finished: {:?}", action, outcome),
            Err(err) => warn!("{:?} failed: {}", action, err),
        }
    }

    debug!("Action queue closed, pager consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingSource, ListSource};
    use crate::transform::Identity;
    use tokio::sync::Semaphore;

    fn small() -> PagerConfig {
        PagerConfig::default()
            .with_page_size(3)
            .with_max_pages(3)
            .with_preload_count(0)
    }

    #[tokio::test]
    async fn test_second_load_while_pending_is_dropped() {
        let gate = Arc::new(Semaphore::new(1));
        let source = Arc::new(CountingSource::gated(10, gate.clone()));
        let pager = Pager::offset(source.clone(), Identity, small()).unwrap();
        pager.wait_idle().await.unwrap();

        assert!(pager.load_next().await.unwrap());
        assert!(!pager.load_next().await.unwrap());
        assert!(!pager.load_previous().await.unwrap());
        assert_eq!(pager.status(), PagerStatus::LoadingAtEnd);

        gate.add_permits(1);
        pager.wait_idle().await.unwrap();
        assert_eq!(source.calls(), vec![0, 3]);
        assert_eq!(pager.view().items, (0..6).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_reset_is_queued_while_loading() {
        let gate = Arc::new(Semaphore::new(1));
        let source = Arc::new(CountingSource::gated(10, gate.clone()));
        let pager = Pager::offset(source.clone(), Identity, small()).unwrap();
        pager.wait_idle().await.unwrap();

        let mut events = pager.subscribe_events();
        assert!(pager.load_next().await.unwrap());
        pager.reset().await.unwrap();
        assert_eq!(pager.status(), PagerStatus::Refreshing);
        gate.add_permits(2);

        loop {
            if let PagerEvent::Refreshed { pages } = events.recv().await.unwrap() {
                assert_eq!(pages, Some(0..=0));
                break;
            }
        }
        assert_eq!(source.calls(), vec![0, 3, 0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_load_admitted_while_reset_is_queued() {
        let gate = Arc::new(Semaphore::new(1));
        let source = Arc::new(CountingSource::gated(10, gate.clone()));
        let pager = Arc::new(Pager::offset(source.clone(), Identity, small()).unwrap());
        pager.wait_idle().await.unwrap();

        let mut events = pager.subscribe_events();
        assert!(pager.load_next().await.unwrap());
        pager.reset().await.unwrap();

        // keeps asking from another worker while the load and the refresh drain
        let contender = tokio::spawn({
            let pager = pager.clone();
            async move {
                while !pager.load_next().await.unwrap() {
                    tokio::task::yield_now().await;
                }
                let mut refreshed = false;
                while let Ok(event) = events.try_recv() {
                    refreshed |= matches!(event, PagerEvent::Refreshed { .. });
                }
                refreshed
            }
        });
        gate.add_permits(2);

        let refreshed = tokio::time::timeout(std::time::Duration::from_secs(5), contender)
            .await
            .unwrap()
            .unwrap();
        assert!(refreshed, "a load was admitted before the queued refresh ran");
        assert_eq!(&source.calls()[..3], &[0, 3, 0]);
        pager.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_stays_busy_until_queue_drains() {
        let gate = Arc::new(Semaphore::new(1));
        let source = Arc::new(CountingSource::gated(10, gate.clone()));
        let pager = Pager::offset(source.clone(), Identity, small()).unwrap();
        pager.wait_idle().await.unwrap();

        assert!(pager.load_next().await.unwrap());
        pager.reset().await.unwrap();
        gate.add_permits(1);

        // the load finishing hands over to the refresh without passing through idle
        while source.calls().len() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(pager.status(), PagerStatus::Refreshing);
        assert!(!pager.load_next().await.unwrap());

        gate.add_permits(1);
        pager.wait_idle().await.unwrap();
        assert_eq!(source.calls(), vec![0, 3, 0]);
        assert_eq!(pager.view().items, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_to_idle() {
        let source = Arc::new(CountingSource::new(10));
        let pager = Pager::offset(source.clone(), Identity, small()).unwrap();
        pager.wait_idle().await.unwrap();
        let mut events = pager.subscribe_events();

        *source.fail_at.lock() = Some(3);
        assert!(pager.load_next().await.unwrap());
        pager.wait_idle().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            PagerEvent::FetchFailed { page_number: 1, .. }
        ));
        assert_eq!(pager.view().items, vec![0, 1, 2]);

        *source.fail_at.lock() = None;
        assert!(pager.load_next().await.unwrap());
        pager.wait_idle().await.unwrap();
        assert_eq!(pager.view().items.len(), 6);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_fetch() {
        let gate = Arc::new(Semaphore::new(1));
        let source = Arc::new(CountingSource::gated(10, gate.clone()));
        let pager = Pager::offset(source.clone(), Identity, small()).unwrap();
        pager.wait_idle().await.unwrap();

        assert!(pager.load_next().await.unwrap());
        pager.shutdown().await;
        gate.add_permits(5);

        assert_eq!(pager.status(), PagerStatus::Idle);
        assert_eq!(pager.view().items, vec![0, 1, 2]);
        assert!(matches!(pager.load_next().await, Err(PagerError::Closed)));
        assert!(matches!(pager.reset().await, Err(PagerError::Closed)));
    }

    #[tokio::test]
    async fn test_cursor_pager_uses_thorough_flag() {
        let source = Arc::new(ListSource::new((0..10).collect()));
        let config = small().with_thorough_duplicate_check(true);
        let pager = Pager::cursor(source.clone(), Identity, config).unwrap();
        pager.wait_idle().await.unwrap();

        assert!(pager.load_next().await.unwrap());
        pager.wait_idle().await.unwrap();
        assert_eq!(source.calls(), vec![None, Some(2)]);
        assert_eq!(pager.view().items, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let source = Arc::new(CountingSource::new(10));
        let result = Pager::offset(source, Identity, small().with_max_pages(0));
        assert!(matches!(result, Err(PagerError::InvalidConfig(_))));
    }
}
