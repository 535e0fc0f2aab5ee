//! The catalog view: two fetches, one gate, one published state.
//!
//! A background worker owns the snapshots. It fetches categories and
//! products concurrently, holds everything back until the minimum loading
//! window after mount has passed, then publishes through a `watch` channel.
//! The worker only holds a weak handle to the channel, and dropping the
//! view aborts it, so a torn-down view never receives another update.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use panaderia_core::{Category, CategoryGroup, Product, resolve};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, warn};

use super::CatalogSource;
use crate::config::CatalogConfig;
use crate::supabase::SupabaseError;

// =============================================================================
// Public state
// =============================================================================

/// Which sources a refresh should refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sources {
    pub categories: bool,
    pub products: bool,
}

impl Sources {
    pub const ALL: Self = Self {
        categories: true,
        products: true,
    };
    pub const PRODUCTS: Self = Self {
        categories: false,
        products: true,
    };

    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.categories && !self.products
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            categories: self.categories || other.categories,
            products: self.products || other.products,
        }
    }
}

/// A fetch that ended in error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// `"categories"` or `"products"`.
    pub source: &'static str,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fetch failed: {}", self.source, self.message)
    }
}

/// Combined state of the catalog as the storefront should render it.
#[derive(Debug, Clone)]
pub enum CatalogState {
    /// Either fetch is pending, or the minimum window has not elapsed.
    Loading,
    /// Both fetches succeeded; groups are resolved from the latest snapshots.
    Ready(Arc<[CategoryGroup]>),
    /// At least one fetch failed and nothing is pending.
    Failed(FetchFailure),
}

impl CatalogState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Resolved groups, if ready.
    #[must_use]
    pub fn groups(&self) -> Option<&[CategoryGroup]> {
        match self {
            Self::Ready(groups) => Some(groups),
            Self::Loading | Self::Failed(_) => None,
        }
    }
}

/// Everything the worker publishes.
#[derive(Debug, Clone)]
pub struct CatalogStatus {
    pub state: CatalogState,
    /// A refetch is in flight behind a state that is already shown.
    pub refreshing: bool,
    pub categories_fetched_at: Option<Instant>,
    pub products_fetched_at: Option<Instant>,
}

impl CatalogStatus {
    const fn mounting() -> Self {
        Self {
            state: CatalogState::Loading,
            refreshing: false,
            categories_fetched_at: None,
            products_fetched_at: None,
        }
    }
}

// =============================================================================
// CatalogView
// =============================================================================

/// Handle to a mounted catalog view.
///
/// Dropping the handle tears the view down: the worker is aborted and any
/// fetch still in flight is discarded.
pub struct CatalogView {
    status: Arc<watch::Sender<CatalogStatus>>,
    requests: mpsc::UnboundedSender<Sources>,
    task: JoinHandle<()>,
    config: CatalogConfig,
}

impl CatalogView {
    /// Mount the view and start both fetches.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn mount<S: CatalogSource>(source: Arc<S>, config: CatalogConfig) -> Self {
        let status = Arc::new(watch::Sender::new(CatalogStatus::mounting()));
        let (requests, inbox) = mpsc::unbounded_channel();

        let worker = Worker {
            source,
            status: Arc::downgrade(&status),
            inbox,
            categories: Slot::new("categories"),
            products: Slot::new("products"),
            gate: Instant::now() + config.min_loading,
        };
        let task = tokio::spawn(worker.run());

        info!(min_loading = ?config.min_loading, "Catalog view mounted");

        Self {
            status,
            requests,
            task,
            config,
        }
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> CatalogStatus {
        self.status.borrow().clone()
    }

    /// Current combined state.
    #[must_use]
    pub fn state(&self) -> CatalogState {
        self.status.borrow().state.clone()
    }

    /// Receiver that observes every published status.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogStatus> {
        self.status.subscribe()
    }

    /// Refetch the given sources.
    ///
    /// A shown catalog stays visible until the new snapshots arrive; a failed
    /// source goes back to pending.
    pub fn refresh(&self, sources: Sources) {
        if sources.is_empty() {
            return;
        }
        if self.requests.send(sources).is_err() {
            warn!("Catalog worker has stopped, refresh ignored");
        }
    }

    /// Refetch whichever snapshots are older than their freshness window.
    ///
    /// Only applies to a ready catalog with no refetch in flight. The view is
    /// marked as refreshing before the request is queued, so concurrent
    /// callers trigger a single refetch. Returns the sources that were
    /// requested.
    pub fn refresh_if_stale(&self) -> Sources {
        let mut wanted = Sources::default();
        self.status.send_if_modified(|status| {
            if status.refreshing || !matches!(status.state, CatalogState::Ready(_)) {
                return false;
            }
            wanted = Sources {
                categories: is_stale(
                    status.categories_fetched_at,
                    self.config.categories_stale_after,
                ),
                products: is_stale(status.products_fetched_at, self.config.products_stale_after),
            };
            if wanted.is_empty() {
                return false;
            }
            status.refreshing = true;
            true
        });

        if !wanted.is_empty() {
            debug!(?wanted, "Catalog snapshot stale, refetching");
            self.refresh(wanted);
        }
        wanted
    }

    /// Retry after a failure. Does nothing unless the catalog has failed.
    ///
    /// Returns whether a retry was started.
    pub fn retry(&self) -> bool {
        if !self.status.borrow().state.is_failed() {
            return false;
        }
        info!("Retrying failed catalog fetch");
        self.refresh(Sources::ALL);
        true
    }
}

impl Drop for CatalogView {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_stale(fetched_at: Option<Instant>, max_age: Duration) -> bool {
    fetched_at.is_none_or(|at| at.elapsed() >= max_age)
}

// =============================================================================
// Worker
// =============================================================================

enum FetchState<T> {
    Pending,
    Ready(Vec<T>),
    Failed(String),
}

struct Slot<T> {
    label: &'static str,
    state: FetchState<T>,
    fetched_at: Option<Instant>,
}

impl<T> Slot<T> {
    const fn new(label: &'static str) -> Self {
        Self {
            label,
            state: FetchState::Pending,
            fetched_at: None,
        }
    }

    fn settle(&mut self, result: Result<Vec<T>, SupabaseError>, now: Instant) {
        match result {
            Ok(items) => {
                debug!(source = self.label, count = items.len(), "Fetch resolved");
                self.state = FetchState::Ready(items);
                self.fetched_at = Some(now);
            }
            Err(e) => {
                warn!(source = self.label, error = %e, "Fetch failed");
                self.state = FetchState::Failed(e.to_string());
            }
        }
    }

    fn failure(&self) -> Option<FetchFailure> {
        match &self.state {
            FetchState::Failed(message) => Some(FetchFailure {
                source: self.label,
                message: message.clone(),
            }),
            FetchState::Pending | FetchState::Ready(_) => None,
        }
    }

    fn reset_if_failed(&mut self) {
        if matches!(self.state, FetchState::Failed(_)) {
            self.state = FetchState::Pending;
        }
    }
}

struct Worker<S> {
    source: Arc<S>,
    status: Weak<watch::Sender<CatalogStatus>>,
    inbox: mpsc::UnboundedReceiver<Sources>,
    categories: Slot<Category>,
    products: Slot<Product>,
    gate: Instant,
}

impl<S: CatalogSource> Worker<S> {
    async fn run(mut self) {
        let mut wanted = Sources::ALL;
        loop {
            self.fetch(wanted).await;
            time::sleep_until(self.gate).await;
            if !self.publish(false) {
                return;
            }

            let Some(next) = self.inbox.recv().await else {
                return;
            };
            wanted = next;
            while let Ok(more) = self.inbox.try_recv() {
                wanted = wanted.union(more);
            }

            if wanted.categories {
                self.categories.reset_if_failed();
            }
            if wanted.products {
                self.products.reset_if_failed();
            }
            if !self.publish(true) {
                return;
            }
        }
    }

    #[instrument(skip(self))]
    async fn fetch(&mut self, wanted: Sources) {
        let source = Arc::clone(&self.source);
        let categories = async {
            if wanted.categories {
                Some(source.fetch_categories().await)
            } else {
                None
            }
        };
        let products = async {
            if wanted.products {
                Some(source.fetch_products().await)
            } else {
                None
            }
        };

        let (categories, products) = tokio::join!(categories, products);
        let now = Instant::now();
        if let Some(result) = categories {
            self.categories.settle(result, now);
        }
        if let Some(result) = products {
            self.products.settle(result, now);
        }
    }

    fn combined(&self) -> CatalogState {
        use FetchState::{Pending, Ready};

        match (&self.categories.state, &self.products.state) {
            (Pending, _) | (_, Pending) => CatalogState::Loading,
            (Ready(categories), Ready(products)) => {
                CatalogState::Ready(resolve(categories, products).into())
            }
            _ => self
                .categories
                .failure()
                .or_else(|| self.products.failure())
                .map_or(CatalogState::Loading, CatalogState::Failed),
        }
    }

    /// Publish the combined state. Returns `false` once the view is gone.
    fn publish(&self, refreshing: bool) -> bool {
        let Some(status) = self.status.upgrade() else {
            debug!("Catalog view torn down, discarding update");
            return false;
        };

        let state = self.combined();
        if let CatalogState::Ready(groups) = &state {
            debug!(groups = groups.len(), "Catalog ready");
        }

        status.send_replace(CatalogStatus {
            state,
            refreshing,
            categories_fetched_at: self.categories.fetched_at,
            products_fetched_at: self.products.fetched_at,
        });
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use panaderia_core::{CategoryId, ProductId};

    use super::*;

    /// Source with fixed latency and scripted results.
    struct FakeSource {
        latency: Duration,
        categories: Vec<Category>,
        products: std::sync::Mutex<Vec<Product>>,
        fail_products: std::sync::atomic::AtomicBool,
        category_calls: AtomicUsize,
        product_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(latency: Duration) -> Self {
            Self {
                latency,
                categories: vec![
                    category("1", "Cafetería"),
                    category("2", "Bebidas"),
                    category("3", "Combos"),
                ],
                products: std::sync::Mutex::new(vec![
                    product("10", "Medialuna", "1"),
                    product("2", "Café", "1"),
                    product("5", "Jugo", "2"),
                ]),
                fail_products: std::sync::atomic::AtomicBool::new(false),
                category_calls: AtomicUsize::new(0),
                product_calls: AtomicUsize::new(0),
            }
        }

        fn failing_products(self) -> Self {
            self.fail_products.store(true, Ordering::SeqCst);
            self
        }
    }

    impl CatalogSource for FakeSource {
        async fn fetch_categories(&self) -> Result<Vec<Category>, SupabaseError> {
            self.category_calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.latency).await;
            Ok(self.categories.clone())
        }

        async fn fetch_products(&self) -> Result<Vec<Product>, SupabaseError> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.latency).await;
            if self.fail_products.load(Ordering::SeqCst) {
                return Err(SupabaseError::Api {
                    status: 503,
                    message: "upstream unavailable".to_string(),
                });
            }
            Ok(self.products.lock().unwrap().clone())
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
        }
    }

    fn product(id: &str, name: &str, category_id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: None,
            price: None,
            image_url: None,
            category_id: Some(CategoryId::new(category_id)),
            user_id: None,
        }
    }

    fn config(min_loading_ms: u64) -> CatalogConfig {
        CatalogConfig {
            min_loading: Duration::from_millis(min_loading_ms),
            ..CatalogConfig::default()
        }
    }

    /// Let spawned tasks run without advancing the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_skeleton_held_for_minimum_window_when_fetches_are_fast() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(50)));
        let view = CatalogView::mount(Arc::clone(&source), config(300));

        time::sleep(Duration::from_millis(60)).await;
        settle().await;
        // both fetches resolved at 50ms, but the window has not elapsed
        assert!(view.state().is_loading());

        time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert!(view.state().is_loading(), "still inside the 300ms window");

        time::sleep(Duration::from_millis(45)).await;
        settle().await;
        let state = view.state();
        let groups = state.groups().unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category.name, "Cafetería");
        let ids: Vec<_> = groups[0].products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "2"]);
        assert!(groups[1].is_empty(), "Combos has no products");
        assert_eq!(groups[2].category.name, "Bebidas");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_extends_loading_past_window() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(800)));
        let view = CatalogView::mount(source, config(300));
        let mut rx = view.subscribe();

        time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert!(view.state().is_loading());

        let start = Instant::now();
        rx.wait_for(|s| !s.state.is_loading()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(view.state().groups().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_run_concurrently() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(400)));
        let view = CatalogView::mount(Arc::clone(&source), config(0));
        let mut rx = view.subscribe();

        let start = Instant::now();
        rx.wait_for(|s| !s.state.is_loading()).await.unwrap();

        // sequential fetches would take 800ms
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(source.category_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.product_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_distinct_from_loading_and_not_retried() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)).failing_products());
        let view = CatalogView::mount(Arc::clone(&source), config(300));
        let mut rx = view.subscribe();

        rx.wait_for(|s| !s.state.is_loading()).await.unwrap();

        match view.state() {
            CatalogState::Failed(failure) => {
                assert_eq!(failure.source, "products");
                assert!(failure.message.contains("upstream unavailable"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        time::sleep(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(source.product_calls.load(Ordering::SeqCst), 1);
        assert!(view.state().is_failed());
        assert!(view.refresh_if_stale().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_goes_back_to_loading_then_recovers() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)).failing_products());
        let view = CatalogView::mount(Arc::clone(&source), config(0));
        let mut rx = view.subscribe();
        rx.wait_for(|s| s.state.is_failed()).await.unwrap();

        source.fail_products.store(false, Ordering::SeqCst);
        assert!(view.retry());

        rx.wait_for(|s| s.state.is_loading()).await.unwrap();
        rx.wait_for(|s| s.state.groups().is_some()).await.unwrap();
        assert_eq!(source.category_calls.load(Ordering::SeqCst), 2);
        assert!(!view.retry(), "nothing to retry once ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_groups_visible_and_recomputes() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)));
        let view = CatalogView::mount(Arc::clone(&source), config(0));
        let mut rx = view.subscribe();
        rx.wait_for(|s| s.state.groups().is_some()).await.unwrap();

        source
            .products
            .lock()
            .unwrap()
            .push(product("7", "Sandwich de miga", "3"));
        view.refresh(Sources::PRODUCTS);

        let refreshing = rx.wait_for(|s| s.refreshing).await.unwrap().clone();
        assert!(refreshing.state.groups().is_some());

        let done = rx.wait_for(|s| !s.refreshing).await.unwrap().clone();
        let groups = done.state.groups().unwrap();
        assert_eq!(groups[1].category.name, "Combos");
        assert_eq!(groups[1].products.len(), 1);
        assert_eq!(source.category_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.product_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_if_stale_uses_per_source_windows() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)));
        let view = CatalogView::mount(Arc::clone(&source), config(0));
        let mut rx = view.subscribe();
        rx.wait_for(|s| s.state.groups().is_some()).await.unwrap();

        assert!(view.refresh_if_stale().is_empty());

        time::sleep(Duration::from_secs(121)).await;
        assert_eq!(view.refresh_if_stale(), Sources::PRODUCTS);
        rx.wait_for(|s| s.refreshing).await.unwrap();
        rx.wait_for(|s| !s.refreshing).await.unwrap();

        // products were just refetched, categories are still inside 300s
        assert!(view.refresh_if_stale().is_empty());
        assert_eq!(source.product_calls.load(Ordering::SeqCst), 2);

        time::sleep(Duration::from_secs(180)).await;
        assert_eq!(view.refresh_if_stale(), Sources::ALL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_checks_refetch_once() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)));
        let view = CatalogView::mount(Arc::clone(&source), config(0));
        let mut rx = view.subscribe();
        rx.wait_for(|s| s.state.groups().is_some()).await.unwrap();

        time::sleep(Duration::from_secs(121)).await;
        // neither call yields, so the worker has not seen the first request
        assert_eq!(view.refresh_if_stale(), Sources::PRODUCTS);
        assert!(view.refresh_if_stale().is_empty());
        assert!(view.status().refreshing);

        rx.wait_for(|s| !s.refreshing).await.unwrap();
        time::sleep(Duration::from_millis(100)).await;
        settle().await;

        assert_eq!(source.product_calls.load(Ordering::SeqCst), 2);
        assert!(!view.status().refreshing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_in_flight_fetch() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(100)));
        let view = CatalogView::mount(Arc::clone(&source), config(300));
        let mut rx = view.subscribe();

        time::sleep(Duration::from_millis(50)).await;
        drop(view);

        time::sleep(Duration::from_secs(1)).await;
        settle().await;

        assert!(rx.borrow().state.is_loading());
        assert!(rx.changed().await.is_err(), "no update after teardown");
        // the source is no longer shared with an aborted worker
        assert_eq!(Arc::strong_count(&source), 1);
    }

    #[test]
    fn test_sources_union() {
        let both = Sources::PRODUCTS.union(Sources {
            categories: true,
            products: false,
        });
        assert_eq!(both, Sources::ALL);
        assert!(Sources::default().is_empty());
    }
}
